use serde::{Deserialize, Serialize};

/// Sentinel limit value meaning "no cap".
pub const UNLIMITED: i64 = -1;

/// Canonical subscription level consumed by the rest of the application.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SubscriptionTier {
    Free,
    Pro,
    Enterprise,
}

impl SubscriptionTier {
    pub fn as_str(&self) -> &'static str {
        match self {
            SubscriptionTier::Free => "free",
            SubscriptionTier::Pro => "pro",
            SubscriptionTier::Enterprise => "enterprise",
        }
    }

    /// Reads a tier stored on a user row. Older rows carry names from previous
    /// pricing pages, so those aliases are folded in here instead of migrated.
    pub fn from_stored(raw: Option<&str>) -> Self {
        let normalized = raw.unwrap_or_default().trim().to_lowercase();
        if normalized.is_empty() {
            return Self::Free;
        }

        let key = normalized
            .split([':', '-', '_', ' ', '/', '.'])
            .next()
            .unwrap_or(normalized.as_str());

        match key {
            // Same split as `Plan::tier`: only the top plan's names read as enterprise.
            "enterprise" | "business" | "organization" | "organisation" | "org" => {
                Self::Enterprise
            }
            "pro" | "premium" | "personal" | "individual" | "family" | "plus" | "team"
            | "teams" => Self::Pro,
            _ => Self::Free,
        }
    }
}

/// Commercial package sold through a billing provider. Many plans map onto one tier.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Deserialize, Serialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Plan {
    Free,
    Individual,
    Family,
    Team,
    Business,
}

impl Plan {
    pub const PAID: [Plan; 4] = [Plan::Individual, Plan::Family, Plan::Team, Plan::Business];

    /// The top commercial plan; the only one that grants the enterprise tier.
    pub const TOP: Plan = Plan::Business;

    pub fn as_str(&self) -> &'static str {
        match self {
            Plan::Free => "free",
            Plan::Individual => "individual",
            Plan::Family => "family",
            Plan::Team => "team",
            Plan::Business => "business",
        }
    }

    pub fn tier(self) -> SubscriptionTier {
        match self {
            Plan::Free => SubscriptionTier::Free,
            plan if plan == Plan::TOP => SubscriptionTier::Enterprise,
            _ => SubscriptionTier::Pro,
        }
    }

    /// Best guess at the plan behind a tier when no price is available.
    pub fn default_for_tier(tier: SubscriptionTier) -> Self {
        match tier {
            SubscriptionTier::Free => Plan::Free,
            SubscriptionTier::Pro => Plan::Individual,
            SubscriptionTier::Enterprise => Plan::Business,
        }
    }

    pub fn limits(self) -> PlanLimits {
        match self {
            Plan::Free => PlanLimits {
                devices: 2,
                vaults: 1,
                team_members: 0,
                storage_mb: 100,
            },
            Plan::Individual => PlanLimits {
                devices: 5,
                vaults: 5,
                team_members: 0,
                storage_mb: 1024,
            },
            Plan::Family => PlanLimits {
                devices: 10,
                vaults: 10,
                team_members: 6,
                storage_mb: 5 * 1024,
            },
            Plan::Team => PlanLimits {
                devices: 50,
                vaults: 50,
                team_members: 25,
                storage_mb: 10 * 1024,
            },
            Plan::Business => PlanLimits {
                devices: UNLIMITED,
                vaults: UNLIMITED,
                team_members: UNLIMITED,
                storage_mb: UNLIMITED,
            },
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanLimits {
    pub devices: i64,
    pub vaults: i64,
    pub team_members: i64,
    pub storage_mb: i64,
}

impl PlanLimits {
    pub fn for_resource(&self, resource: ResourceKind) -> i64 {
        match resource {
            ResourceKind::Devices => self.devices,
            ResourceKind::Vaults => self.vaults,
            ResourceKind::TeamMembers => self.team_members,
            ResourceKind::Storage => self.storage_mb,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum ResourceKind {
    Devices,
    Vaults,
    TeamMembers,
    Storage,
}

impl ResourceKind {
    pub const ALL: [ResourceKind; 4] = [
        ResourceKind::Devices,
        ResourceKind::Vaults,
        ResourceKind::TeamMembers,
        ResourceKind::Storage,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceKind::Devices => "devices",
            ResourceKind::Vaults => "vaults",
            ResourceKind::TeamMembers => "teamMembers",
            ResourceKind::Storage => "storage",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str().eq_ignore_ascii_case(raw.trim()))
    }
}
