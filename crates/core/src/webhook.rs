use serde::{Deserialize, Serialize};

use crate::domain::plan::PlanCatalog;
use crate::domain::registration::RegistrationForm;

/// Flattened, human-labelled copy of a submitted registration, as the
/// notification webhook expects it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct WebhookSummary {
    #[serde(rename = "cep")]
    pub postal_code: String,
    #[serde(rename = "cpf")]
    pub tax_id: String,
    #[serde(rename = "nome")]
    pub name: String,
    pub email: String,
    #[serde(rename = "plano")]
    pub plan_label: String,
    #[serde(rename = "bairro")]
    pub district: String,
    #[serde(rename = "cidade")]
    pub city: String,
    #[serde(rename = "estado")]
    pub state_code: String,
    #[serde(rename = "numero")]
    pub number: String,
    #[serde(rename = "endereco")]
    pub street: String,
    pub whatsapp: String,
    #[serde(rename = "tipo_chip")]
    pub chip_type_label: String,
    #[serde(rename = "complemento")]
    pub complement: String,
    #[serde(rename = "forma_envio")]
    pub shipping_method_label: String,
}

impl WebhookSummary {
    pub fn from_form(form: &RegistrationForm, catalog: &PlanCatalog) -> Self {
        let plan_id = form.plan_id.as_deref().unwrap_or_default();
        Self {
            postal_code: form.postal_code.clone(),
            tax_id: form.tax_id.clone(),
            name: form.full_name.clone(),
            email: form.email.clone(),
            plan_label: catalog.label_for(plan_id).to_string(),
            district: form.district.clone(),
            city: form.city.clone(),
            state_code: form.state_code.clone(),
            number: form.number.clone(),
            street: form.street.clone(),
            whatsapp: form.whatsapp.clone(),
            chip_type_label: form.chip_type.label().to_string(),
            complement: form.complement.clone(),
            shipping_method_label: form
                .shipping_method
                .map(|method| method.label().to_string())
                .unwrap_or_default(),
        }
    }
}
