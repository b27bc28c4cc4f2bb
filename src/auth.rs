//! Authentication settings and how they are applied to a request

use anyhow::{anyhow, bail, Result};
use base64::Engine;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Where an API key is sent
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum KeyLocation {
    #[default]
    Header,
    Query,
}

impl KeyLocation {
    pub fn as_str(&self) -> &str {
        match self {
            KeyLocation::Header => "header",
            KeyLocation::Query => "query",
        }
    }
}

/// Authentication type
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, Default)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum AuthConfig {
    #[default]
    None,
    Bearer {
        token: String,
    },
    Basic {
        username: String,
        password: String,
    },
    #[serde(rename = "apikey")]
    ApiKey {
        name: String,
        value: String,
        #[serde(default)]
        location: KeyLocation,
    },
}

impl AuthConfig {
    /// Parse the command-line form of an auth setting:
    /// `bearer:TOKEN`, `basic:USER:PASS`, `apikey:NAME:VALUE[:header|query]`
    pub fn parse(input: &str) -> Result<AuthConfig> {
        let (kind, rest) = input
            .split_once(':')
            .ok_or_else(|| anyhow!("Invalid auth format: {}", input))?;

        match kind.to_lowercase().as_str() {
            "bearer" => Ok(AuthConfig::Bearer {
                token: rest.to_string(),
            }),
            "basic" => {
                let (username, password) = rest
                    .split_once(':')
                    .ok_or_else(|| anyhow!("Basic auth needs 'basic:USER:PASS'"))?;
                Ok(AuthConfig::Basic {
                    username: username.to_string(),
                    password: password.to_string(),
                })
            }
            "apikey" => {
                let parts: Vec<&str> = rest.split(':').collect();
                if parts.len() < 2 {
                    bail!("API key auth needs 'apikey:NAME:VALUE[:location]'");
                }
                let location = match parts.get(2).map(|l| l.to_lowercase()) {
                    None => KeyLocation::Header,
                    Some(l) if l == "header" => KeyLocation::Header,
                    Some(l) if l == "query" => KeyLocation::Query,
                    Some(other) => bail!("Unknown API key location: {}", other),
                };
                Ok(AuthConfig::ApiKey {
                    name: parts[0].to_string(),
                    value: parts[1].to_string(),
                    location,
                })
            }
            other => Err(anyhow!("Unknown auth type: {}", other)),
        }
    }

    /// Add the credentials to the outgoing headers or query parameters
    pub fn apply(&self, headers: &mut IndexMap<String, String>, query: &mut IndexMap<String, String>) {
        match self {
            AuthConfig::None => {}
            AuthConfig::Bearer { token } => {
                headers.insert("Authorization".into(), format!("Bearer {}", token));
            }
            AuthConfig::Basic { username, password } => {
                let credentials = format!("{}:{}", username, password);
                let encoded = base64::engine::general_purpose::STANDARD.encode(credentials);
                headers.insert("Authorization".into(), format!("Basic {}", encoded));
            }
            AuthConfig::ApiKey {
                name,
                value,
                location,
            } => match location {
                KeyLocation::Header => {
                    headers.insert(name.clone(), value.clone());
                }
                KeyLocation::Query => {
                    query.insert(name.clone(), value.clone());
                }
            },
        }
    }

    pub fn label(&self) -> &str {
        match self {
            AuthConfig::None => "None",
            AuthConfig::Bearer { .. } => "Bearer",
            AuthConfig::Basic { .. } => "Basic",
            AuthConfig::ApiKey { .. } => "API Key",
        }
    }

    pub fn is_none(&self) -> bool {
        matches!(self, AuthConfig::None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_auth_strings() {
        assert_eq!(
            AuthConfig::parse("bearer:abc.def").unwrap(),
            AuthConfig::Bearer { token: "abc.def".into() }
        );
        assert_eq!(
            AuthConfig::parse("basic:user:pa:ss").unwrap(),
            AuthConfig::Basic {
                username: "user".into(),
                password: "pa:ss".into()
            }
        );
        assert_eq!(
            AuthConfig::parse("apikey:api_key:secret:query").unwrap(),
            AuthConfig::ApiKey {
                name: "api_key".into(),
                value: "secret".into(),
                location: KeyLocation::Query
            }
        );
        assert!(AuthConfig::parse("bearer").is_err());
        assert!(AuthConfig::parse("oauth2:x").is_err());
        assert!(AuthConfig::parse("apikey:only").is_err());
    }

    #[test]
    fn test_apply_basic_and_query_key() {
        let mut headers = IndexMap::new();
        let mut query = IndexMap::new();

        AuthConfig::Basic {
            username: "user".into(),
            password: "pass".into(),
        }
        .apply(&mut headers, &mut query);
        assert_eq!(headers["Authorization"], "Basic dXNlcjpwYXNz");

        AuthConfig::ApiKey {
            name: "api_key".into(),
            value: "k".into(),
            location: KeyLocation::Query,
        }
        .apply(&mut headers, &mut query);
        assert_eq!(query["api_key"], "k");
        assert_eq!(headers.len(), 1);
    }
}
