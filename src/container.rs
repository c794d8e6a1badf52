use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Entry of /containers/json
///
/// Fields missing from the response (or `null`) take their zero value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
#[allow(non_snake_case)]
pub struct Container {
    #[serde(deserialize_with = "nullable::deserialize")]
    pub Id: String,
    #[serde(deserialize_with = "nullable::deserialize")]
    pub Names: Vec<String>,
    #[serde(deserialize_with = "nullable::deserialize")]
    pub Image: String,
    #[serde(deserialize_with = "nullable::deserialize")]
    pub ImageID: String,
    #[serde(deserialize_with = "nullable::deserialize")]
    pub Command: String,
    #[serde(deserialize_with = "nullable::deserialize")]
    pub Created: i64,
    #[serde(deserialize_with = "nullable::deserialize")]
    pub State: String,
    #[serde(deserialize_with = "nullable::deserialize")]
    pub Status: String,
    #[serde(deserialize_with = "nullable::deserialize")]
    pub Ports: Vec<Port>,
    #[serde(deserialize_with = "nullable::deserialize")]
    pub Labels: HashMap<String, String>,
    #[serde(deserialize_with = "nullable::deserialize")]
    pub SizeRw: i64,
    #[serde(deserialize_with = "nullable::deserialize")]
    pub SizeRootFs: i64,
    #[serde(deserialize_with = "nullable::deserialize")]
    pub HostConfig: HostConfig,
    #[serde(deserialize_with = "nullable::deserialize")]
    pub NetworkSettings: NetworkSettings,
    #[serde(deserialize_with = "nullable::deserialize")]
    pub Mounts: Vec<MountPoint>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
#[allow(non_snake_case)]
pub struct Port {
    #[serde(deserialize_with = "nullable::deserialize")]
    pub IP: String,
    #[serde(deserialize_with = "nullable::deserialize")]
    pub PrivatePort: u16,
    #[serde(deserialize_with = "nullable::deserialize")]
    pub PublicPort: u16,
    #[serde(deserialize_with = "nullable::deserialize")]
    pub Type: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
#[allow(non_snake_case)]
pub struct HostConfig {
    #[serde(deserialize_with = "nullable::deserialize")]
    pub NetworkMode: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
#[allow(non_snake_case)]
pub struct NetworkSettings {
    #[serde(deserialize_with = "nullable::deserialize")]
    pub Networks: HashMap<String, Network>,
}

/// Endpoint of a container in one network
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
#[allow(non_snake_case)]
pub struct Network {
    #[serde(deserialize_with = "nullable::deserialize")]
    pub NetworkID: String,
    #[serde(deserialize_with = "nullable::deserialize")]
    pub EndpointID: String,
    #[serde(deserialize_with = "nullable::deserialize")]
    pub Gateway: String,
    #[serde(deserialize_with = "nullable::deserialize")]
    pub IPAddress: String,
    #[serde(deserialize_with = "nullable::deserialize")]
    pub IPPrefixLen: u32,
    #[serde(deserialize_with = "nullable::deserialize")]
    pub IPv6Gateway: String,
    #[serde(deserialize_with = "nullable::deserialize")]
    pub GlobalIPv6Address: String,
    #[serde(deserialize_with = "nullable::deserialize")]
    pub GlobalIPv6PrefixLen: u32,
    #[serde(deserialize_with = "nullable::deserialize")]
    pub MacAddress: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
#[allow(non_snake_case)]
pub struct MountPoint {
    /// `volume`, `bind`, `tmpfs` ...
    #[serde(deserialize_with = "nullable::deserialize")]
    pub Type: String,
    /// volume name, empty for bind mounts
    #[serde(deserialize_with = "nullable::deserialize")]
    pub Name: String,
    #[serde(deserialize_with = "nullable::deserialize")]
    pub Source: String,
    #[serde(deserialize_with = "nullable::deserialize")]
    pub Destination: String,
    #[serde(deserialize_with = "nullable::deserialize")]
    pub Driver: String,
    #[serde(deserialize_with = "nullable::deserialize")]
    pub Mode: String,
    #[serde(deserialize_with = "nullable::deserialize")]
    pub RW: bool,
    #[serde(deserialize_with = "nullable::deserialize")]
    pub Propagation: String,
}

impl Container {
    /// First name without the leading `/` the engine reports.
    pub fn name(&self) -> &str {
        self.Names
            .first()
            .map(|name| name.trim_start_matches('/'))
            .unwrap_or_default()
    }
}

impl fmt::Display for Container {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.Id)
    }
}

/// Query filters of /containers/json
///
/// Keys without any value are left out of the encoded filter, the engine
/// would read an empty list as "match nothing".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ContainerFilters {
    #[serde(skip_serializing_if = "Vec::is_empty")]
    ancestor: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    before: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    expose: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    exited: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    health: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    id: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    isolation: Vec<String>,
    #[serde(rename = "is-task", skip_serializing_if = "Vec::is_empty")]
    is_task: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    label: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    name: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    network: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    publish: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    since: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    status: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    volume: Vec<String>,
}

impl ContainerFilters {
    pub fn new() -> Self {
        Self::default()
    }

    /// image name or id the container descends from
    pub fn ancestor(&mut self, ancestor: &str) -> &mut Self {
        self.ancestor.push(ancestor.to_owned());
        self
    }

    /// containers created before the given id or name
    pub fn before(&mut self, before: &str) -> &mut Self {
        self.before.push(before.to_owned());
        self
    }

    /// `<port>[/<proto>]` or `<start>-<end>[/<proto>]`
    pub fn expose(&mut self, expose: &str) -> &mut Self {
        self.expose.push(expose.to_owned());
        self
    }

    pub fn exited(&mut self, code: i32) -> &mut Self {
        self.exited.push(code.to_string());
        self
    }

    /// `starting`, `healthy`, `unhealthy` or `none`
    pub fn health(&mut self, health: &str) -> &mut Self {
        self.health.push(health.to_owned());
        self
    }

    pub fn id(&mut self, id: &str) -> &mut Self {
        self.id.push(id.to_owned());
        self
    }

    /// `default`, `process` or `hyperv` (windows only)
    pub fn isolation(&mut self, isolation: &str) -> &mut Self {
        self.isolation.push(isolation.to_owned());
        self
    }

    pub fn is_task(&mut self, is_task: bool) -> &mut Self {
        self.is_task.push(is_task.to_string());
        self
    }

    /// `key` or `key=value`
    pub fn label(&mut self, label: &str) -> &mut Self {
        self.label.push(label.to_owned());
        self
    }

    pub fn name(&mut self, name: &str) -> &mut Self {
        self.name.push(name.to_owned());
        self
    }

    pub fn network(&mut self, network: &str) -> &mut Self {
        self.network.push(network.to_owned());
        self
    }

    pub fn publish(&mut self, publish: &str) -> &mut Self {
        self.publish.push(publish.to_owned());
        self
    }

    /// containers created since the given id or name
    pub fn since(&mut self, since: &str) -> &mut Self {
        self.since.push(since.to_owned());
        self
    }

    /// `created`, `restarting`, `running`, `removing`, `paused`, `exited` or `dead`
    pub fn status(&mut self, status: &str) -> &mut Self {
        self.status.push(status.to_owned());
        self
    }

    /// volume name or mount point destination
    pub fn volume(&mut self, volume: &str) -> &mut Self {
        self.volume.push(volume.to_owned());
        self
    }
}

/// Treat an explicit `null` like a missing field.
mod nullable {
    use serde::{Deserialize, Deserializer};

    pub fn deserialize<'de, D, T>(de: D) -> Result<T, D::Error>
    where
        D: Deserializer<'de>,
        T: Deserialize<'de> + Default,
    {
        Ok(Option::<T>::deserialize(de)?.unwrap_or_default())
    }
}
