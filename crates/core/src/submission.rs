use secrecy::{ExposeSecret, SecretString};

use crate::domain::registration::{ChipType, RegistrationForm, ShippingMethod};
use crate::masks::unmask;

/// Phrases the registration backend embeds in its response when the CPF is
/// already in use.
pub const DUPLICATE_TAX_ID_MARKERS: [&str; 4] = [
    "cpf já está sendo utilizado",
    "cpf já existe",
    "CPF já cadastrado",
    "já está sendo utilizado",
];

/// Marker of the backend framework's generic exception page.
pub const ERROR_PAGE_MARKER: &str = "Whoops";

/// Fixed values the registration backend expects alongside the form.
#[derive(Clone, Debug)]
pub struct BackendConstants {
    pub session_token: SecretString,
    pub father_id: String,
    pub submission_type: String,
    pub status: String,
}

/// Form-encoded body for the registration endpoint. The session token is
/// kept out of `Debug` output.
#[derive(Clone, Debug)]
pub struct RegistrationPayload {
    session_token: SecretString,
    fields: Vec<(&'static str, String)>,
}

impl RegistrationPayload {
    pub fn build(form: &RegistrationForm, constants: &BackendConstants) -> Self {
        let fields = vec![
            ("status", constants.status.clone()),
            ("father", constants.father_id.clone()),
            ("type", constants.submission_type.clone()),
            ("cpf", unmask(&form.tax_id)),
            ("birth", form.birth_date.trim().to_string()),
            ("name", form.full_name.trim().to_string()),
            ("email", form.email.trim().to_string()),
            ("phone", unmask(&form.phone)),
            ("cell", unmask(&form.whatsapp)),
            ("cep", unmask(&form.postal_code)),
            ("district", form.district.clone()),
            ("city", form.city.clone()),
            ("state", form.state_code.clone()),
            ("street", form.street.clone()),
            ("number", form.number.clone()),
            ("complement", form.complement.clone()),
            ("typeChip", form.chip_type.as_wire().to_string()),
            ("coupon", form.coupon.trim().to_string()),
            ("plan_id", form.plan_id.clone().unwrap_or_default()),
            (
                "typeFrete",
                form.shipping_method.map(|method| method.as_wire().to_string()).unwrap_or_default(),
            ),
        ];

        Self { session_token: constants.session_token.clone(), fields }
    }

    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields.iter().find(|(key, _)| *key == name).map(|(_, value)| value.as_str())
    }

    /// Pairs ready for form encoding, token first.
    pub fn form_pairs(&self) -> Vec<(&str, &str)> {
        let mut pairs = Vec::with_capacity(self.fields.len() + 1);
        pairs.push(("_token", self.session_token.expose_secret()));
        pairs.extend(self.fields.iter().map(|(key, value)| (*key, value.as_str())));
        pairs
    }
}

/// Throwaway registration used to ask the backend whether a CPF is taken.
/// Everything but the CPF and birth date is placeholder data.
pub fn probe_form(tax_id: &str, birth_date: &str) -> RegistrationForm {
    RegistrationForm {
        tax_id: tax_id.to_string(),
        birth_date: birth_date.to_string(),
        full_name: "TEST".to_string(),
        email: "test@test.com".to_string(),
        phone: "(00) 000000000".to_string(),
        whatsapp: "(00) 00000-0000".to_string(),
        postal_code: "00000-000".to_string(),
        district: "TEST".to_string(),
        city: "TEST".to_string(),
        state_code: "SP".to_string(),
        street: "TEST".to_string(),
        number: "0".to_string(),
        chip_type: ChipType::Physical,
        plan_id: Some("178".to_string()),
        shipping_method: Some(ShippingMethod::Carta),
        ..RegistrationForm::default()
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ResponseVerdict {
    Accepted,
    DuplicateTaxId,
    ErrorPage,
}

pub fn contains_duplicate_marker(body: &str) -> bool {
    DUPLICATE_TAX_ID_MARKERS.iter().any(|marker| body.contains(marker))
}

pub fn scan_response_body(body: &str) -> ResponseVerdict {
    if contains_duplicate_marker(body) {
        return ResponseVerdict::DuplicateTaxId;
    }
    if body.contains(ERROR_PAGE_MARKER) {
        return ResponseVerdict::ErrorPage;
    }
    ResponseVerdict::Accepted
}
