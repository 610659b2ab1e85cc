// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

// Component Registry
//
// Every service susi-dev knows how to provision is one variant of `Component`.
// The variant carries, by pattern match, everything the rest of the tool needs:
// - the default config fragment (static lookup table below)
// - the start command baked into unit files and container images
// - the container build recipe (base image, binaries, ports)
// - an optional provisioning hook that seeds example assets
//
// `ComponentRegistry` is built once from the bus endpoint and handed to the
// services that need it; there is no global registry.

use serde_json::json;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Directory on the target holding component certificates and keys
pub const KEY_DIR: &str = "/etc/susi/keys";

/// Directory on the target holding rendered component configs
pub const CONFIG_DIR: &str = "/etc/susi";

/// Directory on the target holding node assets
pub const ASSET_DIR: &str = "/usr/share/susi";

const UNIT_TEMPLATE: &str = include_str!("../../templates/component.service");

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("Unknown component '{0}'. Run `susi-dev components` to list the known components")]
    UnknownComponent(String),

    #[error("Component '{0}' links two nodes and needs a peer (use --connect-to <node>)")]
    PeerRequired(Component),

    #[error("Default config fragment of '{component}' is not valid JSON: {source}")]
    InvalidFragment {
        component: Component,
        #[source]
        source: serde_json::Error,
    },
}

/// How a component's rendered configuration is encoded on disk
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    /// Component is configured purely through its command line
    None,
    /// Bus envelope JSON (`<name>.json`)
    Json,
    /// Caddy web server configuration (`<name>.conf`)
    Caddyfile,
    /// OpenVPN profile (`<name>.ovpn`)
    OpenVpn,
}

impl ConfigFormat {
    pub fn extension(self) -> Option<&'static str> {
        match self {
            ConfigFormat::None => None,
            ConfigFormat::Json => Some("json"),
            ConfigFormat::Caddyfile => Some("conf"),
            ConfigFormat::OpenVpn => Some("ovpn"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Component {
    Core,
    Cluster,
    Authenticator,
    Duktape,
    Heartbeat,
    LevelDb,
    Mqtt,
    Serial,
    Shell,
    Statefile,
    UdpServer,
    Webhooks,
    Gowebstack,
    Caddy,
    NodeJs,
    Go,
    VpnServer,
    VpnClient,
}

impl Component {
    pub const ALL: [Component; 18] = [
        Component::Core,
        Component::Cluster,
        Component::Authenticator,
        Component::Duktape,
        Component::Heartbeat,
        Component::LevelDb,
        Component::Mqtt,
        Component::Serial,
        Component::Shell,
        Component::Statefile,
        Component::UdpServer,
        Component::Webhooks,
        Component::Gowebstack,
        Component::Caddy,
        Component::NodeJs,
        Component::Go,
        Component::VpnServer,
        Component::VpnClient,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Component::Core => "susi-core",
            Component::Cluster => "susi-cluster",
            Component::Authenticator => "susi-authenticator",
            Component::Duktape => "susi-duktape",
            Component::Heartbeat => "susi-heartbeat",
            Component::LevelDb => "susi-leveldb",
            Component::Mqtt => "susi-mqtt",
            Component::Serial => "susi-serial",
            Component::Shell => "susi-shell",
            Component::Statefile => "susi-statefile",
            Component::UdpServer => "susi-udpserver",
            Component::Webhooks => "susi-webhooks",
            Component::Gowebstack => "susi-gowebstack",
            Component::Caddy => "susi-caddy",
            Component::NodeJs => "susi-nodejs",
            Component::Go => "susi-go",
            Component::VpnServer => "vpn-server",
            Component::VpnClient => "vpn-client",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            Component::Core => "SUSI message bus core",
            Component::Cluster => "SUSI cluster bridge",
            Component::Authenticator => "SUSI authenticator",
            Component::Duktape => "SUSI duktape JavaScript engine",
            Component::Heartbeat => "SUSI heartbeat",
            Component::LevelDb => "SUSI LevelDB store",
            Component::Mqtt => "SUSI MQTT bridge",
            Component::Serial => "SUSI serial port bridge",
            Component::Shell => "SUSI shell command runner",
            Component::Statefile => "SUSI state file",
            Component::UdpServer => "SUSI UDP server",
            Component::Webhooks => "SUSI webhooks",
            Component::Gowebstack => "SUSI Go web stack",
            Component::Caddy => "SUSI Caddy static web server",
            Component::NodeJs => "SUSI Node.js engine",
            Component::Go => "SUSI Go engine",
            Component::VpnServer => "OpenVPN server endpoint",
            Component::VpnClient => "OpenVPN client endpoint",
        }
    }

    pub fn config_format(self) -> ConfigFormat {
        match self {
            Component::Core | Component::Gowebstack | Component::NodeJs | Component::Go => {
                ConfigFormat::None
            }
            Component::Caddy => ConfigFormat::Caddyfile,
            Component::VpnServer | Component::VpnClient => ConfigFormat::OpenVpn,
            _ => ConfigFormat::Json,
        }
    }

    /// Components that link this node to another one
    pub fn requires_peer(self) -> bool {
        matches!(self, Component::Cluster | Component::VpnClient)
    }

    /// Default component fragment placed under `"component"` in the bus envelope
    pub fn default_fragment(self) -> Option<&'static str> {
        let fragment = match self {
            Component::Authenticator => r#"{ "file": "/usr/share/susi/authenticator.json" }"#,
            Component::Cluster => r#"{ "nodes": [] }"#,
            Component::Duktape => r#"{ "src": "/usr/share/susi/duktape-script.js" }"#,
            Component::Heartbeat => "{}",
            Component::LevelDb => r#"{ "db": "/usr/share/susi/leveldb" }"#,
            Component::Mqtt => {
                r#"{
                    "mqtt-addr": "localhost",
                    "mqtt-port": 1883,
                    "forward": [".*@mqtt"],
                    "subscribe": ["susi/#"]
                }"#
            }
            Component::Serial => {
                r#"{
                    "ports": [
                        { "id": "arduino", "port": "/dev/ttyUSB0", "baudrate": 9600 }
                    ]
                }"#
            }
            Component::Shell => {
                r#"{
                    "commands": {
                        "stdoutTest": "echo -n 'Hello World!'",
                        "stderrTest": "ls /foobar",
                        "argumentTest": "ls $location"
                    }
                }"#
            }
            Component::Statefile => r#"{ "file": "/usr/share/susi/statefile.json" }"#,
            Component::UdpServer => r#"{ "port": 4001 }"#,
            Component::Webhooks => "{}",
            _ => return None,
        };
        Some(fragment)
    }

    pub fn start_command(self) -> &'static str {
        match self {
            Component::Core => {
                "/usr/local/bin/susi-core -k /etc/susi/keys/susi-core.key -c /etc/susi/keys/susi-core.crt"
            }
            Component::Cluster => "/usr/local/bin/susi-cluster -c /etc/susi/susi-cluster.json",
            Component::Authenticator => {
                "/usr/local/bin/susi-authenticator -c /etc/susi/susi-authenticator.json"
            }
            Component::Duktape => "/usr/local/bin/susi-duktape -c /etc/susi/susi-duktape.json",
            Component::Heartbeat => "/usr/local/bin/susi-heartbeat -c /etc/susi/susi-heartbeat.json",
            Component::LevelDb => "/usr/local/bin/susi-leveldb -c /etc/susi/susi-leveldb.json",
            Component::Mqtt => "/usr/local/bin/susi-mqtt -c /etc/susi/susi-mqtt.json",
            Component::Serial => "/usr/local/bin/susi-serial -c /etc/susi/susi-serial.json",
            Component::Shell => "/usr/local/bin/susi-shell -c /etc/susi/susi-shell.json",
            Component::Statefile => "/usr/local/bin/susi-statefile -c /etc/susi/susi-statefile.json",
            Component::UdpServer => "/usr/local/bin/susi-udpserver -c /etc/susi/susi-udpserver.json",
            Component::Webhooks => "/usr/local/bin/susi-webhooks -c /etc/susi/susi-webhooks.json",
            Component::Gowebstack => {
                "/usr/local/bin/susi-gowebstack -susiaddr 127.0.0.1:4000 -assets /usr/share/susi/webroot/ -cert /etc/susi/keys/susi-gowebstack.crt -key /etc/susi/keys/susi-gowebstack.key -webaddr=:80"
            }
            Component::Caddy => "/usr/local/bin/caddy -conf /etc/susi/susi-caddy.conf",
            Component::NodeJs => "/usr/bin/node /usr/share/susi/nodejs-script.js",
            Component::Go => "/usr/bin/go run /usr/share/susi/golang-program.go",
            Component::VpnServer => "/usr/sbin/openvpn --config /etc/susi/vpn-server.ovpn",
            Component::VpnClient => "/usr/sbin/openvpn --config /etc/susi/vpn-client.ovpn",
        }
    }

    pub fn build_recipe(self) -> BuildRecipe {
        match self {
            Component::Mqtt => BuildRecipe::bus_service(BaseImage::Derived(&MQTT_BASE)),
            Component::LevelDb => BuildRecipe::bus_service(BaseImage::Derived(&LEVELDB_BASE)),
            Component::Gowebstack => BuildRecipe {
                ports: &[ExposedPort { name: "http", protocol: "tcp", port: 80 }],
                ..BuildRecipe::bus_service(BaseImage::Shared)
            },
            Component::Caddy => BuildRecipe {
                base: BaseImage::Derived(&CADDY_BASE),
                bus_binary: false,
                source_files: &[],
                ports: &[
                    ExposedPort { name: "http", protocol: "tcp", port: 80 },
                    ExposedPort { name: "https", protocol: "tcp", port: 443 },
                ],
            },
            Component::NodeJs => BuildRecipe {
                base: BaseImage::Derived(&NODEJS_BASE),
                bus_binary: false,
                source_files: &[("engines/susi-nodejs/susi.js", "/usr/share/susi/susi.js")],
                ports: &[],
            },
            Component::Go => BuildRecipe {
                base: BaseImage::Derived(&GO_BASE),
                bus_binary: false,
                source_files: &[],
                ports: &[],
            },
            Component::VpnServer => BuildRecipe {
                base: BaseImage::Derived(&OPENVPN_BASE),
                bus_binary: false,
                source_files: &[],
                ports: &[ExposedPort { name: "openvpn", protocol: "udp", port: 1194 }],
            },
            Component::VpnClient => BuildRecipe {
                base: BaseImage::Derived(&OPENVPN_BASE),
                bus_binary: false,
                source_files: &[],
                ports: &[],
            },
            _ => BuildRecipe::bus_service(BaseImage::Shared),
        }
    }

    /// Handlebars shell template seeding example assets; rendered with `assets_dir`
    pub fn provisioning_script(self) -> Option<&'static str> {
        match self {
            Component::NodeJs => Some(include_str!("../../templates/nodejs-example.sh.hbs")),
            Component::Go => Some(include_str!("../../templates/go-example.sh.hbs")),
            _ => None,
        }
    }
}

impl fmt::Display for Component {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Component {
    type Err = RegistryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Component::ALL
            .into_iter()
            .find(|c| c.name() == s)
            .ok_or_else(|| RegistryError::UnknownComponent(s.to_string()))
    }
}

// ============================================================================
// Container build recipes
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExposedPort {
    pub name: &'static str,
    pub protocol: &'static str,
    pub port: u16,
}

/// One step of a derived base image build
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BaseStep {
    /// `acbuild run -- <command>`
    Run(&'static str),
    /// `acbuild environment add <key> <value>`
    Env(&'static str, &'static str),
}

/// A cached base image layered on the shared base or on plain alpine
#[derive(Debug, PartialEq, Eq)]
pub struct DerivedBase {
    pub name: &'static str,
    /// Start from the shared susi base instead of `quay.io/coreos/alpine-sh`
    pub on_shared_base: bool,
    pub steps: &'static [BaseStep],
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BaseImage {
    Shared,
    Derived(&'static DerivedBase),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BuildRecipe {
    pub base: BaseImage,
    /// Copy `<build>/alpine/bin/<name>` to `/usr/local/bin/<name>`
    pub bus_binary: bool,
    /// Files copied from the source checkout (relative source path, image path)
    pub source_files: &'static [(&'static str, &'static str)],
    pub ports: &'static [ExposedPort],
}

impl BuildRecipe {
    const fn bus_service(base: BaseImage) -> Self {
        Self {
            base,
            bus_binary: true,
            source_files: &[],
            ports: &[],
        }
    }
}

pub static MQTT_BASE: DerivedBase = DerivedBase {
    name: "susi-mqtt-base",
    on_shared_base: true,
    steps: &[
        BaseStep::Run("/bin/sh -c \"echo -en 'http://dl-4.alpinelinux.org/alpine/v3.3/main\\n' > /etc/apk/repositories\""),
        BaseStep::Run("apk update"),
        BaseStep::Run("apk add mosquitto-libs mosquitto-libs++"),
    ],
};

pub static LEVELDB_BASE: DerivedBase = DerivedBase {
    name: "susi-leveldb-base",
    on_shared_base: true,
    steps: &[
        BaseStep::Run("/bin/sh -c \"echo -en 'http://dl-4.alpinelinux.org/alpine/v3.3/main\\n@testing http://dl-4.alpinelinux.org/alpine/edge/testing\\n' > /etc/apk/repositories\""),
        BaseStep::Run("apk update"),
        BaseStep::Run("apk add leveldb-dev@testing"),
    ],
};

pub static CADDY_BASE: DerivedBase = DerivedBase {
    name: "susi-caddy-base",
    on_shared_base: false,
    steps: &[
        BaseStep::Run("/bin/sh -c \"echo -en 'http://dl-4.alpinelinux.org/alpine/v3.3/main\\n@community http://dl-4.alpinelinux.org/alpine/edge/community\\n' > /etc/apk/repositories\""),
        BaseStep::Run("apk update"),
        BaseStep::Run("apk add go@community git nmap-ncat"),
        BaseStep::Run("mkdir /root/go"),
        BaseStep::Env("GOPATH", "/root/go"),
        BaseStep::Run("go get github.com/mholt/caddy"),
        BaseStep::Run("ln -sf /root/go/bin/caddy /usr/local/bin/caddy"),
        BaseStep::Run("apk del go git"),
    ],
};

pub static NODEJS_BASE: DerivedBase = DerivedBase {
    name: "susi-nodejs-base",
    on_shared_base: false,
    steps: &[BaseStep::Run("apk update"), BaseStep::Run("apk add nodejs")],
};

pub static GO_BASE: DerivedBase = DerivedBase {
    name: "susi-go-base",
    on_shared_base: false,
    steps: &[
        BaseStep::Run("/bin/sh -c \"echo -en 'http://dl-4.alpinelinux.org/alpine/v3.3/main\\n@community http://dl-4.alpinelinux.org/alpine/v3.3/community\\n' > /etc/apk/repositories\""),
        BaseStep::Run("apk update"),
        BaseStep::Run("apk add go@community git"),
        BaseStep::Run("mkdir /root/go"),
        BaseStep::Env("GOPATH", "/root/go"),
        BaseStep::Run("go get github.com/webvariants/susigo"),
    ],
};

pub static OPENVPN_BASE: DerivedBase = DerivedBase {
    name: "susi-openvpn-base",
    on_shared_base: false,
    steps: &[BaseStep::Run("apk update"), BaseStep::Run("apk add openvpn")],
};

// ============================================================================
// Registry
// ============================================================================

/// Address every bus client component connects to
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BusEndpoint {
    pub addr: String,
    pub port: u16,
}

impl Default for BusEndpoint {
    fn default() -> Self {
        Self {
            addr: "localhost".to_string(),
            port: 4000,
        }
    }
}

/// The node a linking component connects to
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Peer {
    pub id: String,
    /// Reachable address of the peer; the peer id is used when unset
    pub address: Option<String>,
}

impl Peer {
    pub fn new(id: impl Into<String>, address: Option<String>) -> Self {
        Self {
            id: id.into(),
            address: address.filter(|a| !a.is_empty()),
        }
    }

    pub fn address(&self) -> &str {
        self.address.as_deref().unwrap_or(&self.id)
    }
}

/// Immutable per-component data, resolved once when the registry is built
#[derive(Debug, Clone)]
pub struct ComponentDescriptor {
    pub component: Component,
    pub default_config: Option<&'static str>,
    pub start_command: &'static str,
    pub unit_file: String,
    pub recipe: BuildRecipe,
    pub provisioning_script: Option<&'static str>,
}

impl ComponentDescriptor {
    pub fn name(&self) -> &'static str {
        self.component.name()
    }

    /// File name of the rendered config inside `<node>/configs/`
    pub fn config_file_name(&self) -> Option<String> {
        self.component
            .config_format()
            .extension()
            .map(|ext| format!("{}.{}", self.name(), ext))
    }

    pub fn unit_file_name(&self) -> String {
        format!("{}.service", self.name())
    }
}

pub struct ComponentRegistry {
    bus: BusEndpoint,
    descriptors: BTreeMap<&'static str, ComponentDescriptor>,
}

impl ComponentRegistry {
    pub fn new(bus: BusEndpoint) -> Self {
        let descriptors = Component::ALL
            .into_iter()
            .map(|component| {
                let descriptor = ComponentDescriptor {
                    component,
                    default_config: component.default_fragment(),
                    start_command: component.start_command(),
                    unit_file: render_unit(component),
                    recipe: component.build_recipe(),
                    provisioning_script: component.provisioning_script(),
                };
                (component.name(), descriptor)
            })
            .collect();

        Self { bus, descriptors }
    }

    pub fn bus(&self) -> &BusEndpoint {
        &self.bus
    }

    pub fn descriptor(&self, name: &str) -> Result<&ComponentDescriptor, RegistryError> {
        self.descriptors
            .get(name)
            .ok_or_else(|| RegistryError::UnknownComponent(name.to_string()))
    }

    pub fn all(&self) -> impl Iterator<Item = &ComponentDescriptor> {
        self.descriptors.values()
    }

    pub fn render_unit_file(&self, name: &str) -> Result<String, RegistryError> {
        Ok(self.descriptor(name)?.unit_file.clone())
    }

    pub fn config_file_name(&self, name: &str) -> Result<Option<String>, RegistryError> {
        Ok(self.descriptor(name)?.config_file_name())
    }

    /// Render the configuration of `name` for `node`.
    ///
    /// Returns an empty string for components configured purely on the
    /// command line; callers skip writing those.
    pub fn render_config(
        &self,
        node: &str,
        name: &str,
        peer: Option<&Peer>,
    ) -> Result<String, RegistryError> {
        let descriptor = self.descriptor(name)?;
        let component = descriptor.component;

        if component.requires_peer() && peer.is_none() {
            return Err(RegistryError::PeerRequired(component));
        }

        match component.config_format() {
            ConfigFormat::None => Ok(String::new()),
            ConfigFormat::Caddyfile => Ok(caddyfile(component, &self.bus)),
            ConfigFormat::OpenVpn => match (component, peer) {
                (Component::VpnClient, Some(peer)) => Ok(vpn_client_profile(node, peer)),
                _ => Ok(vpn_server_profile(component)),
            },
            ConfigFormat::Json => {
                let fragment = descriptor.default_config.unwrap_or("{}");
                let mut fragment: serde_json::Value = serde_json::from_str(fragment)
                    .map_err(|source| RegistryError::InvalidFragment { component, source })?;

                if let (Component::Cluster, Some(peer)) = (component, peer) {
                    if let Some(nodes) = fragment["nodes"].as_array_mut() {
                        nodes.push(cluster_peer_entry(node, peer, self.bus.port));
                    }
                }

                let envelope = json!({
                    "susi-addr": self.bus.addr,
                    "susi-port": self.bus.port,
                    "cert": format!("{}/{}.crt", KEY_DIR, component.name()),
                    "key": format!("{}/{}.key", KEY_DIR, component.name()),
                    "component": fragment,
                });

                serde_json::to_string_pretty(&envelope)
                    .map_err(|source| RegistryError::InvalidFragment { component, source })
            }
        }
    }
}

/// Certificate file stem used on `node` for the link to `peer`
pub fn link_identity(node: &str, peer: &str) -> String {
    format!("{}@{}", node, peer)
}

fn render_unit(component: Component) -> String {
    UNIT_TEMPLATE
        .replace("{{DESCRIPTION}}", component.description())
        .replace("{{EXEC_START}}", component.start_command())
}

fn cluster_peer_entry(node: &str, peer: &Peer, port: u16) -> serde_json::Value {
    let identity = link_identity(node, &peer.id);
    json!({
        "id": peer.id,
        "addr": peer.address(),
        "port": port,
        "cert": format!("{}/{}.crt", KEY_DIR, identity),
        "key": format!("{}/{}.key", KEY_DIR, identity),
        "forwardConsumers": [],
        "forwardProcessors": [],
        "registerConsumers": [],
        "registerProcessors": [],
    })
}

fn caddyfile(component: Component, bus: &BusEndpoint) -> String {
    let name = component.name();
    format!(
        "0.0.0.0:80\n\
         root {ASSET_DIR}/webroot\n\
         gzip\n\
         browse\n\
         ext .html\n\
         websocket /ws \"ncat --ssl-key {KEY_DIR}/{name}.key --ssl-cert {KEY_DIR}/{name}.crt ::1 {port}\"\n\
         log /dev/stdout\n\
         header /api Access-Control-Allow-Origin *\n",
        port = bus.port,
    )
}

fn vpn_server_profile(component: Component) -> String {
    let name = component.name();
    format!(
        "port 1194\n\
         proto udp\n\
         dev tun\n\
         ca {KEY_DIR}/ca.crt\n\
         cert {KEY_DIR}/{name}.crt\n\
         key {KEY_DIR}/{name}.key\n\
         dh {KEY_DIR}/dh.pem\n\
         server 10.8.0.0 255.255.255.0\n\
         client-to-client\n\
         keepalive 10 120\n\
         persist-key\n\
         persist-tun\n\
         verb 3\n"
    )
}

fn vpn_client_profile(node: &str, peer: &Peer) -> String {
    let identity = link_identity(node, &peer.id);
    format!(
        "client\n\
         dev tun\n\
         proto udp\n\
         remote {addr} 1194\n\
         resolv-retry infinite\n\
         nobind\n\
         persist-key\n\
         persist-tun\n\
         ca {KEY_DIR}/{peer}.ca.crt\n\
         cert {KEY_DIR}/{identity}.crt\n\
         key {KEY_DIR}/{identity}.key\n\
         remote-cert-tls server\n\
         verb 3\n",
        addr = peer.address(),
        peer = peer.id,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry() -> ComponentRegistry {
        ComponentRegistry::new(BusEndpoint::default())
    }

    #[test]
    fn test_names_round_trip() {
        for component in Component::ALL {
            assert_eq!(component.name().parse::<Component>().unwrap(), component);
        }
        assert!(matches!(
            "susi-unknown".parse::<Component>(),
            Err(RegistryError::UnknownComponent(_))
        ));
    }

    #[test]
    fn test_json_configs_carry_envelope() {
        let registry = registry();
        let peer = Peer::new("nodeB", Some("10.0.0.5".to_string()));

        for descriptor in registry.all() {
            if descriptor.component.config_format() != ConfigFormat::Json {
                continue;
            }
            let rendered = registry
                .render_config("nodeA", descriptor.name(), Some(&peer))
                .unwrap();
            let value: serde_json::Value = serde_json::from_str(&rendered).unwrap();
            for key in ["susi-addr", "susi-port", "cert", "key", "component"] {
                assert!(value.get(key).is_some(), "{} lacks {}", descriptor.name(), key);
            }
            assert_eq!(value["susi-port"], 4000);
            assert_eq!(
                value["cert"],
                format!("/etc/susi/keys/{}.crt", descriptor.name())
            );
        }
    }

    #[test]
    fn test_core_config_is_empty() {
        let registry = registry();
        assert_eq!(registry.render_config("nodeA", "susi-core", None).unwrap(), "");
        assert!(registry.descriptor("susi-core").unwrap().config_file_name().is_none());
    }

    #[test]
    fn test_cluster_config_embeds_peer() {
        let registry = registry();
        let peer = Peer::new("nodeB", Some("10.0.0.5".to_string()));
        let rendered = registry
            .render_config("nodeA", "susi-cluster", Some(&peer))
            .unwrap();

        let value: serde_json::Value = serde_json::from_str(&rendered).unwrap();
        let entry = &value["component"]["nodes"][0];
        assert_eq!(entry["id"], "nodeB");
        assert_eq!(entry["addr"], "10.0.0.5");
        assert_eq!(entry["cert"], "/etc/susi/keys/nodeA@nodeB.crt");
        assert_eq!(entry["key"], "/etc/susi/keys/nodeA@nodeB.key");
        assert!(rendered.contains(r#""addr": "10.0.0.5""#));
    }

    #[test]
    fn test_cluster_without_address_uses_peer_id() {
        let registry = registry();
        let peer = Peer::new("nodeB", Some(String::new()));
        let rendered = registry
            .render_config("nodeA", "susi-cluster", Some(&peer))
            .unwrap();
        let value: serde_json::Value = serde_json::from_str(&rendered).unwrap();
        assert_eq!(value["component"]["nodes"][0]["addr"], "nodeB");
    }

    #[test]
    fn test_linking_components_need_peer() {
        let registry = registry();
        assert!(matches!(
            registry.render_config("nodeA", "susi-cluster", None),
            Err(RegistryError::PeerRequired(Component::Cluster))
        ));
        assert!(matches!(
            registry.render_config("nodeA", "vpn-client", None),
            Err(RegistryError::PeerRequired(Component::VpnClient))
        ));
    }

    #[test]
    fn test_vpn_profiles() {
        let registry = registry();
        let server = registry.render_config("nodeA", "vpn-server", None).unwrap();
        assert!(server.contains("dh /etc/susi/keys/dh.pem"));
        assert!(server.contains("cert /etc/susi/keys/vpn-server.crt"));

        let peer = Peer::new("gateway", Some("vpn.example.org".to_string()));
        let client = registry
            .render_config("nodeA", "vpn-client", Some(&peer))
            .unwrap();
        assert!(client.contains("remote vpn.example.org 1194"));
        assert!(client.contains("ca /etc/susi/keys/gateway.ca.crt"));
        assert!(client.contains("cert /etc/susi/keys/nodeA@gateway.crt"));
        assert_eq!(
            registry.descriptor("vpn-client").unwrap().config_file_name().as_deref(),
            Some("vpn-client.ovpn")
        );
    }

    #[test]
    fn test_caddy_config_uses_bus_port() {
        let registry = ComponentRegistry::new(BusEndpoint {
            addr: "localhost".to_string(),
            port: 4100,
        });
        let caddy = registry.render_config("nodeA", "susi-caddy", None).unwrap();
        assert!(caddy.starts_with("0.0.0.0:80\n"));
        assert!(caddy.contains("::1 4100\""));
        assert_eq!(
            registry.descriptor("susi-caddy").unwrap().config_file_name().as_deref(),
            Some("susi-caddy.conf")
        );
    }

    #[test]
    fn test_unit_files_have_single_exec_start() {
        let registry = registry();
        for descriptor in registry.all() {
            let unit = registry.render_unit_file(descriptor.name()).unwrap();
            let exec_lines: Vec<&str> = unit
                .lines()
                .filter(|line| line.starts_with("ExecStart="))
                .collect();
            assert_eq!(exec_lines.len(), 1, "{}", descriptor.name());
            assert_eq!(
                exec_lines[0].trim_start_matches("ExecStart="),
                descriptor.start_command
            );
            assert!(unit.contains("Restart=on-failure"));
            assert!(unit.contains(&format!("Description={}", descriptor.component.description())));
        }
    }

    #[test]
    fn test_recipes() {
        assert_eq!(Component::Mqtt.build_recipe().base, BaseImage::Derived(&MQTT_BASE));
        assert!(Component::Core.build_recipe().bus_binary);
        assert!(!Component::Caddy.build_recipe().bus_binary);
        assert_eq!(Component::Gowebstack.build_recipe().ports[0].port, 80);
        assert_eq!(Component::NodeJs.build_recipe().source_files.len(), 1);
    }
}
