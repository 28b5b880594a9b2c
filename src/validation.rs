/// Server-side checks of a quote request before any insurer is contacted
///
/// The browser form validates too, but the insurer API rejects malformed
/// payloads with opaque messages, so the obvious mistakes are caught here:
/// 1. Contact data (email, Brazilian cell phone)
/// 2. CPF/CNPJ digit counts
/// 3. Lease and policy dates
/// 4. Rent and payment conditions
use crate::models::{QuoteRequest, RENT_EXPENSE_KEY};
use chrono::NaiveDate;
use phonenumber::country::Id as CountryId;
use phonenumber::Mode;
use regex::Regex;
use std::sync::OnceLock;

static EMAIL_REGEX: OnceLock<Option<Regex>> = OnceLock::new();

/// Validate email address
///
/// Checks for:
/// - Basic email format (contains @ and .)
/// - Minimum length requirements
pub fn is_valid_email(email: &str) -> bool {
    if email.len() < 5 || !email.contains('@') || !email.contains('.') {
        return false;
    }

    // RFC 5322 simplified: local@domain.tld
    EMAIL_REGEX
        .get_or_init(|| {
            Regex::new(
                r"^[a-zA-Z0-9.!#$%&'*+/=?^_`{|}~-]+@[a-zA-Z0-9](?:[a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?(?:\.[a-zA-Z0-9](?:[a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?)*$",
            )
            .ok()
        })
        .as_ref()
        .is_some_and(|re| re.is_match(email))
}

/// Validate and normalize Brazilian phone number
///
/// Returns: (is_valid, normalized_E164_or_error_msg)
pub fn validate_br_phone(raw: &str) -> (bool, String) {
    if raw.trim().is_empty() || raw.len() < 8 {
        return (false, "Phone too short".to_string());
    }

    match phonenumber::parse(Some(CountryId::BR), raw) {
        Ok(number) if phonenumber::is_valid(&number) => {
            (true, number.format().mode(Mode::E164).to_string())
        }
        Ok(_) => (false, "Invalid Brazilian phone number".to_string()),
        Err(e) => (false, format!("Parse error: {:?}", e)),
    }
}

/// Digits of a CPF/CNPJ, ignoring punctuation.
pub fn document_digits(document: &str) -> String {
    document.chars().filter(|c| c.is_ascii_digit()).collect()
}

/// True for 11 digits (CPF) or 14 digits (CNPJ).
pub fn is_valid_document(document: &str) -> bool {
    matches!(document_digits(document).len(), 11 | 14)
}

fn parse_date(raw: &str) -> Option<NaiveDate> {
    // Accept both plain dates and ISO timestamps
    let date_part = raw.get(..10).unwrap_or(raw);
    NaiveDate::parse_from_str(date_part, "%Y-%m-%d").ok()
}

fn check_period(errors: &mut Vec<String>, field: &str, start: &str, end: &str) {
    match (parse_date(start), parse_date(end)) {
        (Some(start), Some(end)) if end <= start => {
            errors.push(format!("{}: data final deve ser posterior à inicial", field))
        }
        (Some(_), Some(_)) => {}
        _ => errors.push(format!("{}: datas inválidas", field)),
    }
}

/// Validates `request`, collecting every problem found.
pub fn validate_quote_request(request: &QuoteRequest) -> Result<(), Vec<String>> {
    let mut errors = Vec::new();

    check_period(
        &mut errors,
        "policyPeriod",
        &request.policy_period_start,
        &request.policy_period_end,
    );

    for (i, agent) in request.commissioned_agents.iter().enumerate() {
        if !is_valid_document(&agent.document_number) {
            errors.push(format!("commissionedAgents[{}].documentNumber inválido", i));
        }
    }

    if request.participants.is_empty() {
        errors.push("participants: ao menos um participante é obrigatório".to_string());
    }
    for (i, participant) in request.participants.iter().enumerate() {
        if !is_valid_document(&participant.document_number) {
            errors.push(format!("participants[{}].documentNumber inválido", i));
        }
        if !is_valid_email(&participant.contact.email) {
            errors.push(format!("participants[{}].contact.email inválido", i));
        }
        let phone = &participant.contact.cell_phone_number;
        if !phone.is_empty() && !validate_br_phone(phone).0 {
            errors.push(format!("participants[{}].contact.cellPhoneNumber inválido", i));
        }
    }

    match request.risk_objects.first() {
        None => errors.push("riskObjects: objeto de risco é obrigatório".to_string()),
        Some(risk) => {
            if document_digits(&risk.tenant_document_number).len() != 11 {
                errors.push("riskObjects[0].tenantDocumentNumber deve ser um CPF".to_string());
            }
            check_period(
                &mut errors,
                "riskObjects[0].leaseContract",
                &risk.start_lease_contract,
                &risk.end_lease_contract,
            );
            match risk.expense(RENT_EXPENSE_KEY) {
                Some(rent) if rent.is_finite() && rent >= 0.0 => {}
                Some(_) => errors.push(format!("{} inválido", RENT_EXPENSE_KEY)),
                None => errors.push(format!("{} é obrigatório", RENT_EXPENSE_KEY)),
            }
        }
    }

    if request.payment_conditions.installments == 0 {
        errors.push("paymentConditions.installments deve ser maior que zero".to_string());
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
