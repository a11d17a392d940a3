//! Shared identifier types used across the catalog, ledger and dispatch layers.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::WeftError;

/// Which side of the deployment a component belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum HostSide {
    /// The coordinating side that produces action batches.
    Master,
    /// A per-product host that consumes action batches.
    Slave,
}

impl fmt::Display for HostSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HostSide::Master => write!(f, "Master"),
            HostSide::Slave => write!(f, "Slave"),
        }
    }
}

/// Identity of one installable unit.
///
/// The category is a `/`-separated hierarchy (e.g. `Slave/Adapters/Trac/TicketTracker`)
/// and the name is the leaf segment. `category + name` is globally unique
/// within one installation run.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ComponentId {
    category: String,
    name: String,
}

impl ComponentId {
    pub fn new(category: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            category: category.into(),
            name: name.into(),
        }
    }

    pub fn category(&self) -> &str {
        &self.category
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Path segments of the full id, category first.
    pub fn segments(&self) -> Vec<&str> {
        let mut segments: Vec<&str> = self.category.split('/').collect();
        segments.push(&self.name);
        segments
    }

    /// Filesystem-safe form used for per-component ledger files.
    ///
    /// Disallowed characters are escaped as `_XX` per UTF-8 byte, and `_`
    /// itself is escaped, so distinct ids never share a stem.
    pub fn file_stem(&self) -> String {
        let full = self.to_string();
        let mut stem = String::with_capacity(full.len());
        for c in full.chars() {
            if c.is_ascii_alphanumeric() || c == '.' || c == '-' {
                stem.push(c);
            } else {
                let mut buf = [0u8; 4];
                for byte in c.encode_utf8(&mut buf).as_bytes() {
                    stem.push_str(&format!("_{byte:02X}"));
                }
            }
        }
        stem
    }
}

impl fmt::Display for ComponentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.category, self.name)
    }
}

impl FromStr for ComponentId {
    type Err = WeftError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim_matches('/');
        match trimmed.rsplit_once('/') {
            Some((category, name)) if !category.is_empty() && !name.is_empty() => {
                Ok(Self::new(category, name))
            }
            _ => Err(WeftError::UnknownComponent {
                id: trimmed.to_string(),
            }),
        }
    }
}

impl TryFrom<String> for ComponentId {
    type Error = WeftError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<ComponentId> for String {
    fn from(id: ComponentId) -> Self {
        id.to_string()
    }
}

/// Identifier of a hosted third-party product (wiki engine, issue tracker...).
#[derive(
    Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default,
)]
#[serde(transparent)]
pub struct ProductId(pub String);

impl ProductId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ProductId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Logical tool category an action is addressed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ToolId {
    Wiki,
    TicketTracker,
    ProjectManager,
    FilesManager,
    /// Matches every tool category at dispatch time.
    All,
}

impl fmt::Display for ToolId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ToolId::Wiki => "Wiki",
            ToolId::TicketTracker => "TicketTracker",
            ToolId::ProjectManager => "ProjectManager",
            ToolId::FilesManager => "FilesManager",
            ToolId::All => "All",
        };
        write!(f, "{s}")
    }
}

impl FromStr for ToolId {
    type Err = WeftError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Wiki" => Ok(ToolId::Wiki),
            "TicketTracker" => Ok(ToolId::TicketTracker),
            "ProjectManager" => Ok(ToolId::ProjectManager),
            "FilesManager" => Ok(ToolId::FilesManager),
            "All" => Ok(ToolId::All),
            other => Err(WeftError::CommandLine {
                message: format!("Unknown tool category: {other}"),
            }),
        }
    }
}

/// Verb of one dispatchable action (e.g. `Ticket_AddLinkToCommit`).
#[derive(
    Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default,
)]
#[serde(transparent)]
pub struct ActionId(pub String);

impl ActionId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ActionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Structural role of a component, derived from its id path.
///
/// The role drives install-order prerequisites: everything below a side's
/// singleton requires that singleton, and tool/action level components
/// additionally require their owning product.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ComponentKind {
    /// `Master/Server` singleton.
    MasterServer,
    /// `Slave/Client` singleton.
    SlaveClient,
    /// `Master/Processes/<Name>` business-logic plugin.
    Process(String),
    /// `Slave/Listeners/<Name>` inbound listener.
    Listener(String),
    /// `Master/Products/<Product>` or `Slave/Products/<Product>`.
    Product { side: HostSide, product: ProductId },
    /// `Slave/Adapters/<Product>/<Tool>` tool-level component.
    AdapterTool { product: ProductId, tool: ToolId },
    /// `Slave/Adapters/<Product>/<Tool>/<Action>` action adapter.
    AdapterAction {
        product: ProductId,
        tool: ToolId,
        action: ActionId,
    },
}

impl ComponentKind {
    /// Derive the role of a component from its id path.
    pub fn classify(id: &ComponentId) -> Result<Self, WeftError> {
        let unknown = || WeftError::UnknownComponent { id: id.to_string() };
        let segments = id.segments();
        match segments.as_slice() {
            ["Master", "Server"] => Ok(ComponentKind::MasterServer),
            ["Slave", "Client"] => Ok(ComponentKind::SlaveClient),
            ["Master", "Processes", name] => Ok(ComponentKind::Process(name.to_string())),
            ["Slave", "Listeners", name] => Ok(ComponentKind::Listener(name.to_string())),
            ["Master", "Products", product] => Ok(ComponentKind::Product {
                side: HostSide::Master,
                product: ProductId::new(*product),
            }),
            ["Slave", "Products", product] => Ok(ComponentKind::Product {
                side: HostSide::Slave,
                product: ProductId::new(*product),
            }),
            ["Slave", "Adapters", product, tool] => Ok(ComponentKind::AdapterTool {
                product: ProductId::new(*product),
                tool: tool.parse().map_err(|_| unknown())?,
            }),
            ["Slave", "Adapters", product, tool, action] => Ok(ComponentKind::AdapterAction {
                product: ProductId::new(*product),
                tool: tool.parse().map_err(|_| unknown())?,
                action: ActionId::new(*action),
            }),
            _ => Err(unknown()),
        }
    }

    /// Components that must already hold an installed record before this
    /// one may be installed, in check order.
    pub fn prerequisites(&self) -> Vec<ComponentId> {
        let master_server = ComponentId::new("Master", "Server");
        let slave_client = ComponentId::new("Slave", "Client");
        match self {
            ComponentKind::MasterServer | ComponentKind::SlaveClient => Vec::new(),
            ComponentKind::Process(_) => vec![master_server],
            ComponentKind::Listener(_) => vec![slave_client],
            ComponentKind::Product { side, .. } => match side {
                HostSide::Master => vec![master_server],
                HostSide::Slave => vec![slave_client],
            },
            ComponentKind::AdapterTool { product, .. }
            | ComponentKind::AdapterAction { product, .. } => vec![
                slave_client,
                ComponentId::new("Slave/Products", product.as_str()),
            ],
        }
    }

    /// The owning product id, for product-scoped components.
    pub fn product(&self) -> Option<&ProductId> {
        match self {
            ComponentKind::Product { product, .. }
            | ComponentKind::AdapterTool { product, .. }
            | ComponentKind::AdapterAction { product, .. } => Some(product),
            _ => None,
        }
    }

    /// Which side of the deployment this component runs on.
    pub fn side(&self) -> HostSide {
        match self {
            ComponentKind::MasterServer
            | ComponentKind::Process(_)
            | ComponentKind::Product {
                side: HostSide::Master,
                ..
            } => HostSide::Master,
            _ => HostSide::Slave,
        }
    }
}
