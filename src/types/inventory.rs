use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Deployment grouping of a host. Purely an ordering label for the rollout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Crawler,
    WebWorker,
}

impl Role {
    /// Order in which roles are visited in both rollout passes.
    pub const ROLLOUT_ORDER: [Role; 2] = [Role::Crawler, Role::WebWorker];

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Crawler => "crawler",
            Role::WebWorker => "web_worker",
        }
    }

    /// Human form used in progress output.
    pub fn label(&self) -> &'static str {
        match self {
            Role::Crawler => "crawler",
            Role::WebWorker => "web worker",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum AddressError {
    #[error("host address is empty")]
    Empty,

    #[error("host address '{address}' contains whitespace")]
    Whitespace { address: String },

    #[error("host address '{address}' must not start with '-'")]
    LeadingDash { address: String },

    #[error("host address '{address}' has an empty user or host part")]
    EmptyPart { address: String },
}

/// An ssh destination in `[user@]host` form.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct HostAddress {
    user: Option<String>,
    host: String,
}

impl HostAddress {
    pub fn user(&self) -> Option<&str> {
        self.user.as_deref()
    }

    pub fn host(&self) -> &str {
        &self.host
    }
}

impl FromStr for HostAddress {
    type Err = AddressError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.is_empty() {
            return Err(AddressError::Empty);
        }
        if s.chars().any(char::is_whitespace) {
            return Err(AddressError::Whitespace {
                address: s.to_string(),
            });
        }
        // ssh would read it as an option
        if s.starts_with('-') {
            return Err(AddressError::LeadingDash {
                address: s.to_string(),
            });
        }

        match s.rsplit_once('@') {
            Some((user, host)) if user.is_empty() || host.is_empty() => {
                Err(AddressError::EmptyPart {
                    address: s.to_string(),
                })
            }
            Some((user, host)) => Ok(Self {
                user: Some(user.to_string()),
                host: host.to_string(),
            }),
            None => Ok(Self {
                user: None,
                host: s.to_string(),
            }),
        }
    }
}

impl TryFrom<String> for HostAddress {
    type Error = AddressError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<HostAddress> for String {
    fn from(address: HostAddress) -> Self {
        address.to_string()
    }
}

impl fmt::Display for HostAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.user {
            Some(user) => write!(f, "{}@{}", user, self.host),
            None => f.write_str(&self.host),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HostTarget {
    pub address: HostAddress,
    pub role: Role,
}

impl HostTarget {
    pub fn new(address: HostAddress, role: Role) -> Self {
        Self { address, role }
    }
}

/// All hosts of one run, in the order they were declared.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fleet {
    hosts: Vec<HostTarget>,
}

impl Fleet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_role(
        mut self,
        role: Role,
        addresses: impl IntoIterator<Item = HostAddress>,
    ) -> Self {
        self.hosts.extend(
            addresses
                .into_iter()
                .map(|address| HostTarget::new(address, role)),
        );
        self
    }

    pub fn push(&mut self, target: HostTarget) {
        self.hosts.push(target);
    }

    pub fn is_empty(&self) -> bool {
        self.hosts.is_empty()
    }

    pub fn len(&self) -> usize {
        self.hosts.len()
    }

    pub fn hosts_with_role(&self, role: Role) -> impl Iterator<Item = &HostTarget> {
        self.hosts.iter().filter(move |target| target.role == role)
    }

    /// Hosts grouped by [`Role::ROLLOUT_ORDER`], declaration order kept within a role.
    pub fn in_rollout_order(&self) -> impl Iterator<Item = &HostTarget> {
        Role::ROLLOUT_ORDER
            .into_iter()
            .flat_map(move |role| self.hosts_with_role(role))
    }
}
