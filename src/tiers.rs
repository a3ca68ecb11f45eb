//! Quota tiers and their resolution from API-key permissions

use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tier {
    Default,
    Basic,
    Premium,
    Unlimited,
}

// requests allowed per window, and how long the window lasts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TierLimits {
    pub points: u32,
    pub window: Duration,
}

impl TierLimits {
    // the strict variant runs at half the normal allowance (integer floor)
    pub fn strict(&self) -> TierLimits {
        TierLimits {
            points: self.points / 2,
            window: self.window,
        }
    }
}

impl Tier {
    // first matching permission wins: unlimited > premium > basic > default
    pub fn resolve(permissions: &[String]) -> Tier {
        for (perm, tier) in [
            ("unlimited", Tier::Unlimited),
            ("premium", Tier::Premium),
            ("basic", Tier::Basic),
        ] {
            if permissions.iter().any(|p| p == perm) {
                return tier;
            }
        }
        Tier::Default
    }

    pub fn limits(&self) -> TierLimits {
        let (points, secs) = match self {
            Tier::Default => (10, 60),
            Tier::Basic => (50, 60),
            Tier::Premium => (500, 60),
            Tier::Unlimited => (u32::MAX, 60),
        };
        TierLimits {
            points,
            window: Duration::from_secs(secs),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Tier::Default => "default",
            Tier::Basic => "basic",
            Tier::Premium => "premium",
            Tier::Unlimited => "unlimited",
        }
    }
}
