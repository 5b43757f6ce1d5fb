use crate::models::{Appointment, AppointmentStatus};

/// Figures shown on the progress page.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ProgressStats {
    pub total: usize,
    pub pending: usize,
    pub completed: usize,
    pub rejected: usize,
    /// Sum of amounts on completed appointments.
    pub earnings: f64,
    /// Sum of amounts on rejected appointments.
    pub losses: f64,
}

impl ProgressStats {
    pub fn of(appointments: &[Appointment]) -> Self {
        appointments.iter().fold(Self::default(), |mut s, a| {
            s.total += 1;
            let amount = a.amount.unwrap_or(0.0);
            match a.status {
                AppointmentStatus::Pending => s.pending += 1,
                AppointmentStatus::Completed => {
                    s.completed += 1;
                    s.earnings += amount;
                }
                AppointmentStatus::Rejected => {
                    s.rejected += 1;
                    s.losses += amount;
                }
            }
            s
        })
    }

    /// Completed share of all appointments, in percent, one decimal.
    pub fn success_rate(&self) -> f64 {
        if self.total == 0 {
            return 0.0;
        }
        let rate = self.completed as f64 / self.total as f64 * 100.0;
        (rate * 10.0).round() / 10.0
    }
}

/// `Rs. 12,345`, with up to two decimals when the amount has a fraction.
pub fn format_currency(amount: f64) -> String {
    let negative = amount < 0.0;
    let cents = (amount.abs() * 100.0).round() as u64;
    let (whole, frac) = (cents / 100, cents % 100);

    let digits = whole.to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(c);
    }

    let sign = if negative && cents > 0 { "-" } else { "" };
    match frac {
        0 => format!("Rs. {sign}{grouped}"),
        f if f % 10 == 0 => format!("Rs. {sign}{grouped}.{}", f / 10),
        f => format!("Rs. {sign}{grouped}.{f:02}"),
    }
}
