use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

/// Expense description that carries the monthly rent inside a risk object.
pub const RENT_EXPENSE_KEY: &str = "VALOR_ALUGUEL";

/// Quote statuses used across insurers and the dashboard.
pub mod status {
    pub const EM_ANALISE: &str = "Em análise";
    pub const ACEITA: &str = "Aceita";
    pub const EMITIDA: &str = "Emitida";
    pub const RECUSADA: &str = "Recusada";
    pub const CANCELADA: &str = "Cancelada";
    pub const PENDENTE: &str = "Pendente";
    /// Synthesized by the aggregator for insurers that failed to quote.
    pub const RECUSADO: &str = "Recusado";
}

// ============ Quote Request (canonical payload) ============

/// Canonical rent-guarantee quote request.
///
/// Built by the client from its form state and forwarded verbatim to the
/// insurers. Fields this service does not model are kept in `extra` so they
/// survive the round trip.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuoteRequest {
    /// Policy start date (YYYY-MM-DD).
    pub policy_period_start: String,
    /// Policy end date (YYYY-MM-DD).
    pub policy_period_end: String,
    #[serde(default = "default_policy_type")]
    pub policy_type: String,
    /// Broker and policy owner.
    #[serde(default)]
    pub commissioned_agents: Vec<CommissionedAgent>,
    /// Beneficiary, policy holder and insured.
    #[serde(default)]
    pub participants: Vec<Participant>,
    /// The leased property being insured.
    #[serde(default)]
    pub risk_objects: Vec<RiskObject>,
    pub payment_conditions: PaymentConditions,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

fn default_policy_type() -> String {
    "Unique".to_string()
}

impl QuoteRequest {
    /// Monthly rent of the first risk object, or 0 when no rent expense is listed.
    pub fn rent_amount(&self) -> f64 {
        self.risk_objects
            .first()
            .and_then(|risk| risk.expense(RENT_EXPENSE_KEY))
            .unwrap_or(0.0)
    }

    /// First participant playing `role`.
    pub fn participant(&self, role: ParticipantRole) -> Option<&Participant> {
        self.participants.iter().find(|p| p.role == role)
    }

    /// Tenant name as shown on the dashboard.
    pub fn tenant_name(&self) -> Option<&str> {
        self.participant(ParticipantRole::PolicyHolder)
            .or_else(|| self.participants.first())
            .map(|p| p.contact.name.as_str())
    }

    /// Tenant CPF as shown on the dashboard.
    pub fn tenant_document(&self) -> Option<&str> {
        self.risk_objects
            .first()
            .map(|risk| risk.tenant_document_number.as_str())
            .or_else(|| self.participants.first().map(|p| p.document_number.as_str()))
    }

    /// Single-line address of the insured property.
    pub fn property_address(&self) -> Option<String> {
        self.risk_objects
            .first()
            .map(|risk| risk.risk_location.address.one_line())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommissionedAgent {
    /// CNPJ of the broker or owner.
    pub document_number: String,
    pub role: AgentRole,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub commission_percentage: Option<f64>,
    #[serde(default)]
    pub lead: bool,
    #[serde(default)]
    pub is_payer: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AgentRole {
    Broker,
    PolicyOwner,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Participant {
    /// CPF or CNPJ.
    pub document_number: String,
    pub role: ParticipantRole,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<Address>,
    pub contact: Contact,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub participation_percentage: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub main: Option<bool>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ParticipantRole {
    Beneficiary,
    PolicyHolder,
    Insured,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Address {
    pub street: String,
    pub number: String,
    pub district: String,
    pub city: String,
    pub state: String,
    pub zip_code: String,
    #[serde(default = "default_country")]
    pub country: String,
    #[serde(rename = "type", default = "default_address_type")]
    pub address_type: String,
}

fn default_country() -> String {
    "BRA".to_string()
}

fn default_address_type() -> String {
    "Residential".to_string()
}

impl Address {
    /// "street, number, district, city/state"
    pub fn one_line(&self) -> String {
        format!(
            "{}, {}, {}, {}/{}",
            self.street, self.number, self.district, self.city, self.state
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Contact {
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub phone_number: String,
    #[serde(default)]
    pub cell_phone_number: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RiskObject {
    #[serde(rename = "type", default = "default_risk_type")]
    pub risk_type: String,
    pub tenant_document_number: String,
    pub start_lease_contract: String,
    pub end_lease_contract: String,
    #[serde(default)]
    pub coverages: Vec<Coverage>,
    pub risk_location: RiskLocation,
    #[serde(default)]
    pub expenses: Vec<Expense>,
    pub plan_key: String,
    pub occupation: String,
    #[serde(default)]
    pub inhabited: bool,
    #[serde(default)]
    pub multiple: u32,
}

fn default_risk_type() -> String {
    "rentalProperty".to_string()
}

impl RiskObject {
    /// Value of the expense whose description equals `description`.
    pub fn expense(&self, description: &str) -> Option<f64> {
        self.expenses
            .iter()
            .find(|e| e.description == description)
            .map(|e| e.value)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Coverage {
    pub key: String,
    pub insured_amount: f64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RiskLocation {
    #[serde(default)]
    pub national_coverage: bool,
    pub address: Address,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Expense {
    pub description: String,
    /// A missing or `null` value (an empty form field) counts as 0.
    #[serde(default, deserialize_with = "null_as_zero")]
    pub value: f64,
}

fn null_as_zero<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<f64>::deserialize(deserializer)?.unwrap_or(0.0))
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentConditions {
    /// e.g. "Invoice".
    pub payment_type: String,
    pub installments: u32,
}

// ============ Quote Result ============

/// One insurer's outcome for one aggregation call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuoteResult {
    pub insurer_name: String,
    /// Path of the insurer logo served by the frontend.
    pub insurer_logo: String,
    /// `None` when the insurer declined or failed.
    pub quote_id: Option<String>,
    pub status: String,
    /// Decimal string with two places, `None` when declined.
    pub total_premium: Option<String>,
    pub message: String,
}

impl QuoteResult {
    pub fn is_declined(&self) -> bool {
        self.quote_id.is_none()
    }
}

// ============ Cotation history ============

/// A stored submission together with every insurer outcome.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CotationRecord {
    pub id: Uuid,
    pub user_id: String,
    pub user_email: String,
    pub created_at: DateTime<Utc>,
    pub payload: QuoteRequest,
    /// Same order as the aggregator's insurer registry.
    pub all_insurer_quotes: Vec<QuoteResult>,
    /// Headline status used by the dashboard status filter.
    pub main_status: String,
}

impl CotationRecord {
    /// Materializes a new record, assigning its id and creation time.
    pub fn create(new: NewCotation, created_at: DateTime<Utc>) -> Self {
        let main_status = main_status(&new.all_insurer_quotes);
        Self {
            id: Uuid::new_v4(),
            user_id: new.user_id,
            user_email: new.user_email,
            created_at,
            payload: new.payload,
            all_insurer_quotes: new.all_insurer_quotes,
            main_status,
        }
    }
}

/// Headline status: the first insurer that produced a quote, else the first
/// result, else "Pendente".
pub fn main_status(quotes: &[QuoteResult]) -> String {
    quotes
        .iter()
        .find(|q| !q.is_declined())
        .or_else(|| quotes.first())
        .map(|q| q.status.clone())
        .unwrap_or_else(|| status::PENDENTE.to_string())
}

/// Cotation about to be stored, owned by an authenticated user.
#[derive(Debug, Clone)]
pub struct NewCotation {
    pub user_id: String,
    pub user_email: String,
    pub payload: QuoteRequest,
    pub all_insurer_quotes: Vec<QuoteResult>,
}

/// Body of `POST /api/cotations`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateCotationRequest {
    pub payload: QuoteRequest,
    #[serde(default)]
    pub all_insurer_quotes: Vec<QuoteResult>,
}

/// Query string of `GET /api/cotations`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CotationQueryParams {
    pub status: Option<String>,
    /// YYYY-MM-DD, inclusive.
    pub date_start: Option<String>,
    /// YYYY-MM-DD, inclusive through the end of the day.
    pub date_end: Option<String>,
    pub search: Option<String>,
    /// "Hoje", "7 Dias", "15 Dias", "30 Dias" or "Todos".
    pub period: Option<String>,
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;

    fn address(street: &str) -> Address {
        Address {
            street: street.to_string(),
            number: "123".to_string(),
            district: "Centro".to_string(),
            city: "São Paulo".to_string(),
            state: "SP".to_string(),
            zip_code: "01001000".to_string(),
            country: "BRA".to_string(),
            address_type: "Residential".to_string(),
        }
    }

    fn participant(role: ParticipantRole) -> Participant {
        Participant {
            document_number: "52998224725".to_string(),
            role,
            address: Some(address("Rua das Flores")),
            contact: Contact {
                name: "Maria Souza".to_string(),
                email: "maria.souza@example.com".to_string(),
                phone_number: String::new(),
                cell_phone_number: "11987654321".to_string(),
            },
            participation_percentage: None,
            main: None,
        }
    }

    /// A complete request with the given monthly rent.
    pub fn quote_request(rent: f64) -> QuoteRequest {
        QuoteRequest {
            policy_period_start: "2026-11-01".to_string(),
            policy_period_end: "2027-10-31".to_string(),
            policy_type: "Unique".to_string(),
            commissioned_agents: vec![CommissionedAgent {
                document_number: "11222333000181".to_string(),
                role: AgentRole::Broker,
                commission_percentage: Some(10.0),
                lead: true,
                is_payer: false,
            }],
            participants: vec![
                participant(ParticipantRole::Beneficiary),
                participant(ParticipantRole::PolicyHolder),
                participant(ParticipantRole::Insured),
            ],
            risk_objects: vec![RiskObject {
                risk_type: "rentalProperty".to_string(),
                tenant_document_number: "52998224725".to_string(),
                start_lease_contract: "2026-11-01".to_string(),
                end_lease_contract: "2029-10-31".to_string(),
                coverages: vec![Coverage {
                    key: "basica".to_string(),
                    insured_amount: rent + 500.0,
                }],
                risk_location: RiskLocation {
                    national_coverage: false,
                    address: address("Av. Paulista"),
                },
                expenses: vec![
                    Expense {
                        description: RENT_EXPENSE_KEY.to_string(),
                        value: rent,
                    },
                    Expense {
                        description: "VALOR_CONDOMINIO".to_string(),
                        value: 400.0,
                    },
                    Expense {
                        description: "VALOR_IPTU".to_string(),
                        value: 100.0,
                    },
                ],
                plan_key: "Basic".to_string(),
                occupation: "Residencial".to_string(),
                inhabited: true,
                multiple: 30,
            }],
            payment_conditions: PaymentConditions {
                payment_type: "Invoice".to_string(),
                installments: 12,
            },
            extra: Map::new(),
        }
    }
}
