//! `wa.me` deep links for replying to patients.

use crate::models::{Appointment, Query};
use crate::stats::format_currency;

const COUNTRY_CODE: &str = "92";
const SIGNATURE: &str = "Dr Usama Sheikh Admin";

/// Digits only, in international form without `+`.
///
/// A national number with a leading `0` has it replaced by the country code;
/// a number already carrying the country code is left as is.
pub fn normalize_phone(phone: &str) -> String {
    let digits: String = phone.chars().filter(char::is_ascii_digit).collect();
    if let Some(rest) = digits.strip_prefix('0') {
        format!("{COUNTRY_CODE}{rest}")
    } else if digits.starts_with(COUNTRY_CODE) || digits.is_empty() {
        digits
    } else {
        format!("{COUNTRY_CODE}{digits}")
    }
}

pub fn whatsapp_url(phone: &str, message: &str) -> String {
    format!(
        "https://wa.me/{}?text={}",
        normalize_phone(phone),
        urlencoding::encode(message)
    )
}

pub fn appointment_confirmation(a: &Appointment) -> String {
    let mut msg = format!(
        "Hello {}! Your appointment is confirmed:\n\n\
         📅 Date: {}\n\
         ⏰ Time: {}\n\
         🏥 Service: {}\n\
         📍 Clinic: {}",
        a.name, a.date, a.time, a.service, a.clinic
    );
    if let Some(amount) = a.amount {
        msg.push_str(&format!("\n💰 Amount: {}", format_currency(amount)));
    }
    msg.push_str("\n\nPlease arrive 15 minutes early. Thank you!");
    msg
}

pub fn appointment_follow_up(a: &Appointment) -> String {
    format!(
        "Hello {}, this is regarding your dental appointment at our clinic.",
        a.name
    )
}

pub fn query_acknowledgement(q: &Query) -> String {
    format!(
        "Hello {}, Thank you for contacting our dental clinic regarding {}. \
         We have received your query and our team will get back to you shortly \
         with the information you requested. Best regards, {SIGNATURE}",
        q.name,
        q.department_label()
    )
}
