use crate::types::{DetailedSection, DocumentAnalysis, Risk, RiskLevel};

/// Lease excerpt loaded by "Try Sample Document".
pub const SAMPLE_DOCUMENT: &str = r#"RESIDENTIAL LEASE AGREEMENT

This Lease Agreement is entered into on [Date] between [Landlord Name] ("Landlord") and [Tenant Name] ("Tenant") for the rental of the property located at [Property Address].

RENT: Tenant agrees to pay rent in the amount of $2,400.00 per month, due on the 1st day of each month. A late fee of $75.00 will be charged for payments received after the 5th day of the month.

SECURITY DEPOSIT: Tenant shall deposit with Landlord the sum of $2,400.00 as security for the faithful performance of the terms of this lease. This deposit may be used by Landlord to repair damages caused by Tenant beyond normal wear and tear.

RENT INCREASES: Landlord may increase the rent amount with sixty (60) days written notice to Tenant.

MAINTENANCE: Tenant shall be responsible for all repairs and maintenance under $100.00, including but not limited to light bulbs, air filters, and minor plumbing issues..."#;

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

fn risk(level: RiskLevel, text: &str) -> Risk {
    Risk {
        level,
        text: text.into(),
    }
}

fn section(title: &str, content: &str, risk: RiskLevel) -> DetailedSection {
    DetailedSection {
        title: title.into(),
        content: content.into(),
        risk: Some(risk),
    }
}

/// Fixed analysis shown when a real analysis fails.
pub fn sample_analysis() -> DocumentAnalysis {
    DocumentAnalysis {
        document_type: "Residential Lease Agreement".into(),
        risk_level: RiskLevel::Medium,
        risk_reason: "Contains some tenant-unfavorable clauses that require attention".into(),
        financial_impact:
            "$2,400/month rent + $2,400 security deposit + potential $150/month pet fee".into(),
        key_deadline: "30-day notice required for termination".into(),
        plain_summary: "This is a standard one-year residential lease for a two-bedroom \
            apartment. You'll pay $2,400 monthly rent plus utilities, with a security deposit \
            equal to one month's rent. The landlord can increase rent with 60 days notice, and \
            you're responsible for minor repairs under $100. Early termination requires 60 days \
            notice plus a penalty fee."
            .into(),
        financial_breakdown: strings(&[
            "Monthly rent: $2,400",
            "Security deposit: $2,400 (refundable)",
            "Pet fee: $150/month (if applicable)",
            "Late payment fee: $75 after 5-day grace period",
            "Early termination fee: 2 months' rent ($4,800)",
            "Key replacement: $150 per key",
            "Carpet cleaning fee: $200 (move-out)",
        ]),
        risks: vec![
            risk(
                RiskLevel::High,
                "Landlord can increase rent with only 60 days notice - no cap specified",
            ),
            risk(
                RiskLevel::Medium,
                "You're responsible for all repairs under $100, which could add up",
            ),
            risk(
                RiskLevel::Medium,
                "Security deposit may not cover 'excessive wear and tear' (subjective)",
            ),
            risk(RiskLevel::Low, "Standard late fees and termination procedures"),
        ],
        recommendations: strings(&[
            "Negotiate a rent increase cap (e.g., maximum 5% annually)",
            "Request clarification on what constitutes 'excessive wear and tear'",
            "Ask for a pre-move-in inspection report to document existing damage",
            "Clarify maintenance responsibilities with specific examples",
            "Request 90-day notice for rent increases instead of 60 days",
        ]),
        questions_to_ask: strings(&[
            "What's the maximum rent increase percentage you'll accept annually?",
            "Can you provide examples of repairs I'd be responsible for under $100?",
            "Will you conduct a move-in inspection with me present?",
            "Are utilities included or separate, and what's the average monthly cost?",
            "What's your typical timeline for returning security deposits?",
        ]),
        detailed_sections: vec![
            section(
                "Rent and Payment Terms",
                "Rent is due on the 1st of each month with a 5-day grace period. After day 5, \
                 a $75 late fee applies. This is standard and reasonable for most markets.",
                RiskLevel::Low,
            ),
            section(
                "Rent Increase Clause",
                "The landlord can increase rent with 60 days written notice. There's no cap on \
                 increase amounts, which means they could potentially raise rent significantly.",
                RiskLevel::High,
            ),
            section(
                "Maintenance Responsibilities",
                "Tenant is responsible for repairs under $100 including light bulbs, filters, \
                 and minor plumbing issues. While common, this could become expensive if \
                 multiple small repairs are needed.",
                RiskLevel::Medium,
            ),
            section(
                "Security Deposit Terms",
                "One month's rent ($2,400) is required as security deposit. Will be returned \
                 within 30 days minus deductions for damages beyond 'normal wear and tear' - a \
                 subjective term that could be interpreted broadly.",
                RiskLevel::Medium,
            ),
        ],
    }
}
