use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::domain::address::Address;
use crate::errors::DomainError;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChipType {
    #[default]
    #[serde(rename = "fisico")]
    Physical,
    #[serde(rename = "eSim")]
    ESim,
}

impl ChipType {
    pub fn as_wire(&self) -> &'static str {
        match self {
            Self::Physical => "fisico",
            Self::ESim => "eSim",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Physical => "Físico",
            Self::ESim => "e-SIM",
        }
    }
}

impl std::str::FromStr for ChipType {
    type Err = DomainError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim() {
            "fisico" | "physical" => Ok(Self::Physical),
            "eSim" | "esim" | "e-sim" => Ok(Self::ESim),
            other => Err(DomainError::InvalidField {
                field: "typeChip",
                message: format!("unsupported chip type `{other}`"),
            }),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ShippingMethod {
    /// Registered mail.
    #[serde(rename = "Carta")]
    Carta,
    /// Picked up at the association or from an associate.
    #[serde(rename = "semFrete")]
    SemFrete,
    #[serde(rename = "eSim")]
    ESim,
}

impl ShippingMethod {
    pub fn as_wire(&self) -> &'static str {
        match self {
            Self::Carta => "Carta",
            Self::SemFrete => "semFrete",
            Self::ESim => "eSim",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Carta => "Carta Registrada",
            Self::SemFrete => "Retirar na Associação",
            Self::ESim => "e-SIM",
        }
    }
}

impl std::str::FromStr for ShippingMethod {
    type Err = DomainError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim() {
            "Carta" | "carta" => Ok(Self::Carta),
            "semFrete" | "sem_frete" => Ok(Self::SemFrete),
            "eSim" | "esim" => Ok(Self::ESim),
            other => Err(DomainError::InvalidField {
                field: "typeFrete",
                message: format!("unsupported shipping method `{other}`"),
            }),
        }
    }
}

/// Everything the applicant types or picks. Text fields hold their display
/// (masked) form; cleaning happens when the payload is built.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RegistrationForm {
    pub tax_id: String,
    pub birth_date: String,
    pub full_name: String,
    pub email: String,
    pub phone: String,
    pub whatsapp: String,
    pub postal_code: String,
    pub district: String,
    pub city: String,
    pub state_code: String,
    pub street: String,
    pub number: String,
    pub complement: String,
    pub chip_type: ChipType,
    pub coupon: String,
    pub plan_id: Option<String>,
    pub shipping_method: Option<ShippingMethod>,
}

impl RegistrationForm {
    pub fn merge_address(&mut self, address: Address) {
        self.street = address.street;
        self.district = address.district;
        self.city = address.city;
        self.state_code = address.state_code;
        self.complement = address.complement;
    }

    pub fn has_plan(&self) -> bool {
        self.plan_id.as_deref().is_some_and(|plan_id| !plan_id.trim().is_empty())
    }

    pub fn parsed_birth_date(&self) -> Option<NaiveDate> {
        parse_birth_date(&self.birth_date)
    }
}

/// Accepts the ISO form produced by date inputs and the `DD/MM/YYYY` form
/// people type by hand.
pub fn parse_birth_date(value: &str) -> Option<NaiveDate> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .or_else(|_| NaiveDate::parse_from_str(value, "%d/%m/%Y"))
        .ok()
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::{parse_birth_date, ChipType, RegistrationForm, ShippingMethod};
    use crate::domain::address::Address;

    #[test]
    fn wire_values_round_trip_through_from_str() {
        for chip in [ChipType::Physical, ChipType::ESim] {
            assert_eq!(chip.as_wire().parse::<ChipType>(), Ok(chip));
        }
        for method in [ShippingMethod::Carta, ShippingMethod::SemFrete, ShippingMethod::ESim] {
            assert_eq!(method.as_wire().parse::<ShippingMethod>(), Ok(method));
        }
        assert!("drone".parse::<ShippingMethod>().is_err());
    }

    #[test]
    fn merge_address_overwrites_previous_values() {
        let mut form = RegistrationForm {
            street: "Rua Antiga".to_string(),
            complement: "apto 3".to_string(),
            ..RegistrationForm::default()
        };
        form.merge_address(Address {
            street: "Avenida Paulista".to_string(),
            district: "Bela Vista".to_string(),
            city: "São Paulo".to_string(),
            state_code: "SP".to_string(),
            complement: String::new(),
        });

        assert_eq!(form.street, "Avenida Paulista");
        assert_eq!(form.complement, "");
        assert_eq!(form.state_code, "SP");
    }

    #[test]
    fn birth_date_accepts_iso_and_brazilian_layouts() {
        let expected = NaiveDate::from_ymd_opt(1990, 5, 17);
        assert_eq!(parse_birth_date("1990-05-17"), expected);
        assert_eq!(parse_birth_date("17/05/1990"), expected);
        assert_eq!(parse_birth_date(""), None);
        assert_eq!(parse_birth_date("1990-13-40"), None);
    }

    #[test]
    fn blank_plan_id_counts_as_unselected() {
        let mut form = RegistrationForm::default();
        assert!(!form.has_plan());
        form.plan_id = Some("  ".to_string());
        assert!(!form.has_plan());
        form.plan_id = Some("178".to_string());
        assert!(form.has_plan());
    }
}
