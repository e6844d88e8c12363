use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::registration::{ChipType, RegistrationForm, ShippingMethod};
use crate::errors::DomainError;
use crate::masks::{mask_phone, mask_postal_code, mask_tax_id};

/// Free-text and masked inputs. Chip type, plan and shipping method are picked
/// through their own setters on [`FormSession`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FormField {
    TaxId,
    BirthDate,
    FullName,
    Email,
    Phone,
    Whatsapp,
    PostalCode,
    District,
    City,
    StateCode,
    Street,
    Number,
    Complement,
    Coupon,
}

impl FormField {
    pub fn format(&self, raw: &str) -> String {
        match self {
            Self::TaxId => mask_tax_id(raw),
            Self::Phone | Self::Whatsapp => mask_phone(raw),
            Self::PostalCode => mask_postal_code(raw),
            _ => raw.to_string(),
        }
    }

    fn slot<'a>(&self, form: &'a mut RegistrationForm) -> &'a mut String {
        match self {
            Self::TaxId => &mut form.tax_id,
            Self::BirthDate => &mut form.birth_date,
            Self::FullName => &mut form.full_name,
            Self::Email => &mut form.email,
            Self::Phone => &mut form.phone,
            Self::Whatsapp => &mut form.whatsapp,
            Self::PostalCode => &mut form.postal_code,
            Self::District => &mut form.district,
            Self::City => &mut form.city,
            Self::StateCode => &mut form.state_code,
            Self::Street => &mut form.street,
            Self::Number => &mut form.number,
            Self::Complement => &mut form.complement,
            Self::Coupon => &mut form.coupon,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaxIdStatus {
    #[default]
    Idle,
    Valid,
    Invalid,
    Exists,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PostalCodeStatus {
    #[default]
    Idle,
    Found,
    NotFound,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldStatus {
    pub tax_id: TaxIdStatus,
    pub postal_code: PostalCodeStatus,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatusKind {
    #[default]
    None,
    Success,
    Error,
    Warning,
}

/// Banner shown above the form. Recomputed on every action.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmissionStatus {
    pub loading: bool,
    pub message: Option<String>,
    pub kind: StatusKind,
}

impl SubmissionStatus {
    pub fn idle() -> Self {
        Self::default()
    }

    pub fn loading(message: impl Into<String>) -> Self {
        Self { loading: true, message: Some(message.into()), kind: StatusKind::None }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self { loading: false, message: Some(message.into()), kind: StatusKind::Error }
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self { loading: false, message: Some(message.into()), kind: StatusKind::Warning }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SuccessDialog {
    pub title: String,
    pub body: Vec<String>,
    pub call_to_action: String,
    pub call_to_action_url: String,
}

impl SuccessDialog {
    pub fn new(call_to_action_url: impl Into<String>) -> Self {
        Self {
            title: "Parabéns! Seu cadastro foi realizado com sucesso.".to_string(),
            body: vec![
                "Para darmos continuidade com a ativação do seu plano, é necessário realizar o \
                 pagamento da sua taxa associativa, no valor proporcional ao plano escolhido."
                    .to_string(),
                "Logo após efetuar o pagamento, você receberá um e-mail para fazer a biometria \
                 digital."
                    .to_string(),
            ],
            call_to_action: "Realizar Adesão".to_string(),
            call_to_action_url: call_to_action_url.into(),
        }
    }
}

/// One applicant's form, from first keystroke to submission.
#[derive(Clone, Debug)]
pub struct FormSession {
    id: Uuid,
    pub(crate) form: RegistrationForm,
    pub(crate) field_status: FieldStatus,
    pub(crate) status: SubmissionStatus,
    pub(crate) name_locked: bool,
    pub(crate) success_dialog: Option<SuccessDialog>,
}

impl Default for FormSession {
    fn default() -> Self {
        Self::new()
    }
}

impl FormSession {
    pub fn new() -> Self {
        Self {
            id: Uuid::new_v4(),
            form: RegistrationForm::default(),
            field_status: FieldStatus::default(),
            status: SubmissionStatus::idle(),
            name_locked: false,
            success_dialog: None,
        }
    }

    /// Starts a session from values captured elsewhere, re-applying the masks
    /// and the chip-type shipping rule.
    pub fn from_form(mut form: RegistrationForm) -> Self {
        let masked =
            [FormField::TaxId, FormField::Phone, FormField::Whatsapp, FormField::PostalCode];
        for field in masked {
            let slot = field.slot(&mut form);
            let formatted = field.format(slot);
            *slot = formatted;
        }
        if form.chip_type == ChipType::ESim {
            form.shipping_method = Some(ShippingMethod::ESim);
        }
        Self { form, ..Self::new() }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn form(&self) -> &RegistrationForm {
        &self.form
    }

    pub fn field_status(&self) -> FieldStatus {
        self.field_status
    }

    pub fn status(&self) -> &SubmissionStatus {
        &self.status
    }

    pub fn is_name_locked(&self) -> bool {
        self.name_locked
    }

    pub fn success_dialog(&self) -> Option<&SuccessDialog> {
        self.success_dialog.as_ref()
    }

    pub fn is_completed(&self) -> bool {
        self.success_dialog.is_some()
    }

    /// Applies one keystroke-level edit. Editing the CPF or CEP resets that
    /// field's status; editing the CPF also releases a pre-filled name.
    pub fn edit(&mut self, field: FormField, raw: &str) -> Result<(), DomainError> {
        if field == FormField::FullName && self.name_locked {
            return Err(DomainError::InvalidField {
                field: "name",
                message: "name was filled from the registry and is read-only".to_string(),
            });
        }

        *field.slot(&mut self.form) = field.format(raw);

        match field {
            FormField::TaxId => {
                self.field_status.tax_id = TaxIdStatus::Idle;
                self.name_locked = false;
            }
            FormField::PostalCode => self.field_status.postal_code = PostalCodeStatus::Idle,
            _ => {}
        }
        Ok(())
    }

    /// Switching chip type clears the plan; eSim needs no shipping, a
    /// physical chip must have one chosen again.
    pub fn select_chip_type(&mut self, chip_type: ChipType) {
        self.form.chip_type = chip_type;
        self.form.plan_id = None;
        self.form.shipping_method = match chip_type {
            ChipType::ESim => Some(ShippingMethod::ESim),
            ChipType::Physical => None,
        };
    }

    pub fn select_plan(&mut self, plan_id: impl Into<String>) {
        let plan_id = plan_id.into();
        self.form.plan_id = (!plan_id.trim().is_empty()).then_some(plan_id);
    }

    pub fn select_shipping_method(&mut self, method: ShippingMethod) -> Result<(), DomainError> {
        let allowed = match self.form.chip_type {
            ChipType::ESim => method == ShippingMethod::ESim,
            ChipType::Physical => method != ShippingMethod::ESim,
        };
        if !allowed {
            return Err(DomainError::InvalidField {
                field: "typeFrete",
                message: format!(
                    "`{}` shipping is not available for {} chips",
                    method.as_wire(),
                    self.form.chip_type.as_wire()
                ),
            });
        }
        self.form.shipping_method = Some(method);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::{FormField, FormSession, PostalCodeStatus, TaxIdStatus};
    use crate::domain::registration::{ChipType, RegistrationForm, ShippingMethod};

    #[test]
    fn edit_masks_digit_fields_and_keeps_text_fields_verbatim() {
        let mut session = FormSession::new();
        session.edit(FormField::TaxId, "52998224725").expect("tax id edit");
        session.edit(FormField::Whatsapp, "11987654321").expect("whatsapp edit");
        session.edit(FormField::PostalCode, "01310100").expect("postal code edit");
        session.edit(FormField::Street, "Rua 25 de Março").expect("street edit");

        assert_eq!(session.form().tax_id, "529.982.247-25");
        assert_eq!(session.form().whatsapp, "(11) 98765-4321");
        assert_eq!(session.form().postal_code, "01310-100");
        assert_eq!(session.form().street, "Rua 25 de Março");
    }

    #[test]
    fn editing_a_validated_field_resets_its_status() {
        let mut session = FormSession::new();
        session.field_status.tax_id = TaxIdStatus::Exists;
        session.field_status.postal_code = PostalCodeStatus::Found;
        session.name_locked = true;

        session.edit(FormField::PostalCode, "0131").expect("postal code edit");
        assert_eq!(session.field_status().postal_code, PostalCodeStatus::Idle);
        assert_eq!(session.field_status().tax_id, TaxIdStatus::Exists);

        session.edit(FormField::TaxId, "529").expect("tax id edit");
        assert_eq!(session.field_status().tax_id, TaxIdStatus::Idle);
        assert!(!session.is_name_locked());
    }

    #[test]
    fn locked_name_rejects_edits() {
        let mut session = FormSession::new();
        session.form.full_name = "MARIA DA SILVA".to_string();
        session.name_locked = true;

        assert!(session.edit(FormField::FullName, "Outra Pessoa").is_err());
        assert_eq!(session.form().full_name, "MARIA DA SILVA");
    }

    #[test]
    fn chip_type_switch_clears_plan_and_sets_shipping_rule() {
        let mut session = FormSession::new();
        session.select_plan("178");
        session.select_shipping_method(ShippingMethod::Carta).expect("carta for physical chip");

        session.select_chip_type(ChipType::ESim);
        assert_eq!(session.form().plan_id, None);
        assert_eq!(session.form().shipping_method, Some(ShippingMethod::ESim));
        assert!(session.select_shipping_method(ShippingMethod::Carta).is_err());

        session.select_chip_type(ChipType::Physical);
        assert_eq!(session.form().shipping_method, None);
        assert!(session.select_shipping_method(ShippingMethod::ESim).is_err());
    }

    #[test]
    fn from_form_normalizes_masks_and_esim_shipping() {
        let session = FormSession::from_form(RegistrationForm {
            tax_id: "52998224725".to_string(),
            postal_code: "01310100".to_string(),
            chip_type: ChipType::ESim,
            ..RegistrationForm::default()
        });

        assert_eq!(session.form().tax_id, "529.982.247-25");
        assert_eq!(session.form().postal_code, "01310-100");
        assert_eq!(session.form().shipping_method, Some(ShippingMethod::ESim));
    }
}
