use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Carrier {
    Vivo,
    Tim,
    Claro,
}

impl Carrier {
    pub const ALL: [Carrier; 3] = [Carrier::Vivo, Carrier::Tim, Carrier::Claro];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Vivo => "VIVO",
            Self::Tim => "TIM",
            Self::Claro => "CLARO",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct Plan {
    pub id: &'static str,
    pub label: &'static str,
    pub carrier: Carrier,
}

const PLANS: &[Plan] = &[
    Plan { id: "178", label: "VIVO - 40GB com Ligações Ilimitadas", carrier: Carrier::Vivo },
    Plan { id: "179", label: "VIVO - 60GB com Ligações Ilimitadas", carrier: Carrier::Vivo },
    Plan { id: "180", label: "VIVO - 100GB com Ligações Ilimitadas", carrier: Carrier::Vivo },
    Plan { id: "181", label: "TIM - 40GB com Ligações Ilimitadas", carrier: Carrier::Tim },
    Plan { id: "182", label: "TIM - 60GB com Ligações Ilimitadas", carrier: Carrier::Tim },
    Plan { id: "183", label: "TIM - 100GB com Ligações Ilimitadas", carrier: Carrier::Tim },
    Plan { id: "184", label: "CLARO - 40GB com Ligações Ilimitadas", carrier: Carrier::Claro },
    Plan { id: "185", label: "CLARO - 60GB com Ligações Ilimitadas", carrier: Carrier::Claro },
    Plan { id: "186", label: "CLARO - 100GB com Ligações Ilimitadas", carrier: Carrier::Claro },
];

/// Read-only plan list, grouped by carrier in display order.
#[derive(Clone, Copy, Debug)]
pub struct PlanCatalog {
    plans: &'static [Plan],
}

impl Default for PlanCatalog {
    fn default() -> Self {
        Self { plans: PLANS }
    }
}

impl PlanCatalog {
    pub fn find(&self, plan_id: &str) -> Option<&Plan> {
        self.plans.iter().find(|plan| plan.id == plan_id)
    }

    pub fn by_carrier(&self, carrier: Carrier) -> impl Iterator<Item = &Plan> + '_ {
        self.plans.iter().filter(move |plan| plan.carrier == carrier)
    }

    /// Label shown to humans; unknown ids are passed through unchanged.
    pub fn label_for<'a>(&self, plan_id: &'a str) -> &'a str {
        match self.find(plan_id) {
            Some(plan) => plan.label,
            None => plan_id,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{Carrier, PlanCatalog};

    #[test]
    fn every_carrier_has_plans() {
        let catalog = PlanCatalog::default();
        for carrier in Carrier::ALL {
            assert!(catalog.by_carrier(carrier).count() > 0, "{} has no plans", carrier.as_str());
        }
    }

    #[test]
    fn label_resolves_known_ids_and_passes_unknown_through() {
        let catalog = PlanCatalog::default();
        assert_eq!(catalog.label_for("178"), "VIVO - 40GB com Ligações Ilimitadas");
        assert_eq!(catalog.label_for("999"), "999");
    }
}
