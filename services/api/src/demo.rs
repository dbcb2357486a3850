use crate::infra::{InMemoryEventPublisher, InMemoryMarketplaceRepository};
use chrono::{DateTime, Duration, Utc};
use clap::Args;
use mortgage_match::config::MarketplaceConfig;
use mortgage_match::error::AppError;
use mortgage_match::marketplace::engine::amortization::compute_payment;
use mortgage_match::marketplace::{
    ActorId, ApplicationTerms, FactorKind, LenderRegistration, LenderResponse, LoanPurpose,
    LoanType, MarketplaceError, MarketplaceService, OccupancyType, OfferTerms, PropertyType,
};
use std::sync::Arc;

#[derive(Args, Debug)]
pub(crate) struct QuoteArgs {
    /// Loan principal in whole currency units
    #[arg(long)]
    pub(crate) principal: u64,
    /// Annual interest rate in basis points (550 = 5.50%)
    #[arg(long)]
    pub(crate) rate_bps: u32,
    /// Loan term in months
    #[arg(long, default_value_t = 360)]
    pub(crate) term_months: u32,
}

#[derive(Args, Debug)]
pub(crate) struct DemoArgs {
    /// Requested loan amount for the sample borrower
    #[arg(long, default_value_t = 300_000)]
    pub(crate) loan_amount: u64,
    /// Appraised property value for the sample borrower
    #[arg(long, default_value_t = 400_000)]
    pub(crate) property_value: u64,
    /// Credit score for the sample borrower
    #[arg(long, default_value_t = 705)]
    pub(crate) credit_score: u16,
    /// Skip the lender response step at the end of the demo.
    #[arg(long)]
    pub(crate) skip_response: bool,
}

pub(crate) fn run_quote(args: QuoteArgs) -> Result<(), AppError> {
    let QuoteArgs {
        principal,
        rate_bps,
        term_months,
    } = args;

    let quote =
        compute_payment(principal, rate_bps, term_months).map_err(MarketplaceError::from)?;

    println!(
        "Quote for {} over {} months at {}",
        principal,
        term_months,
        format_rate(rate_bps)
    );
    println!("- Monthly payment: {}", quote.monthly_payment);
    println!("- Total interest:  {}", quote.total_interest);
    println!(
        "- Total paid:      {}",
        quote.monthly_payment.saturating_mul(u64::from(term_months))
    );
    Ok(())
}

pub(crate) fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let config = MarketplaceConfig::default();
    let events = Arc::new(InMemoryEventPublisher::default());
    let service = MarketplaceService::new(
        Arc::new(InMemoryMarketplaceRepository::new(&config)),
        events.clone(),
        &config,
    );
    let now = Utc::now();
    let owner = config.owner.clone();

    println!("Mortgage marketplace demo");
    let lenders = [
        (ActorId("harbor-bank".to_string()), "Harbor Bank", 400, 680),
        (ActorId("summit-cu".to_string()), "Summit Credit Union", 550, 620),
        (ActorId("keystone-lending".to_string()), "Keystone Lending", 475, 740),
    ];

    let mut offers = Vec::with_capacity(lenders.len());
    for (lender, name, rate_bps, min_credit_score) in &lenders {
        service.register_lender(lender, registration(name), now)?;
        service.approve_lender(&owner, lender)?;
        let offer_id =
            service.create_offer(lender, demo_offer(*rate_bps, *min_credit_score, now), now)?;
        println!(
            "- {} published {} at {} (min credit {})",
            name,
            offer_id,
            format_rate(*rate_bps),
            min_credit_score
        );
        offers.push((lender.clone(), offer_id));
    }

    let borrower = ActorId("demo-borrower".to_string());
    let terms = ApplicationTerms {
        loan_amount: args.loan_amount,
        property_value: args.property_value,
        credit_score: args.credit_score,
        annual_income: 110_000,
        monthly_debt_payments: 1_450,
        loan_purpose: LoanPurpose::Purchase,
        property_type: PropertyType::SingleFamily,
        occupancy_type: OccupancyType::Primary,
        down_payment: args.property_value.saturating_sub(args.loan_amount),
        preferred_term_months: None,
    };
    let application_id = match service.submit_application(&borrower, terms, now) {
        Ok(application_id) => application_id,
        Err(err) => {
            println!("\nApplication rejected: {} ({})", err, err.symbol());
            return Ok(());
        }
    };
    let application = service.application(application_id)?;
    println!(
        "\nSubmitted {} for {} (debt-to-income {})",
        application_id,
        application.terms.loan_amount,
        format_rate(application.debt_to_income_bps)
    );

    println!("\nEligibility");
    for (_, offer_id) in &offers {
        let result = service.evaluate_eligibility(application_id, *offer_id, now)?;
        let score = service
            .compute_match_score(&result)
            .map(|score| score.to_string())
            .unwrap_or_else(|| "n/a".to_string());
        let failed: Vec<&str> = result.failed_factors.iter().map(factor_label).collect();
        println!(
            "- {}: payment {} | closing {} | platform fee {} | LTV {} | score {} | failed [{}]",
            offer_id,
            result.estimated_payment,
            result.total_closing_costs,
            result.platform_fee,
            format_rate(result.loan_to_value_bps),
            score,
            failed.join(", ")
        );
    }

    if let [(_, first), (_, second), ..] = offers.as_slice() {
        let comparison = service.compare_offers(*first, *second, application_id)?;
        println!(
            "\nComparison {} vs {}: payment {:+} | interest {:+} | closing {:+}",
            first,
            second,
            comparison.payment_difference,
            comparison.interest_difference,
            comparison.closing_cost_difference
        );
    }

    let matches = service.match_application(&borrower, application_id, now)?;
    println!("\nMatches created: {}", matches.len());
    for record in &matches {
        println!(
            "- {} score {} payment {}",
            record.offer_id, record.match_score, record.estimated_payment
        );
    }

    if !args.skip_response {
        if let Some(best) = matches.iter().max_by_key(|record| record.match_score) {
            if let Some((lender, _)) = offers.iter().find(|(_, id)| *id == best.offer_id) {
                service.respond_to_match(
                    lender,
                    application_id,
                    best.offer_id,
                    LenderResponse::Interested,
                )?;
                println!("\n{} responded interested on {}", lender, best.offer_id);
            }
        }
    }

    let view = service.application_status(application_id)?;
    match serde_json::to_string_pretty(&view) {
        Ok(json) => println!("\nPublic status payload:\n{}", json),
        Err(err) => println!("\nPublic status payload unavailable: {}", err),
    }

    let published = events.events();
    if published.is_empty() {
        println!("Notifications: none dispatched");
    } else {
        println!("Notifications:");
        for event in published {
            println!("  - {:?} -> {}", event.kind, event.recipient);
        }
    }

    Ok(())
}

fn registration(name: &str) -> LenderRegistration {
    LenderRegistration {
        name: name.to_string(),
        license_number: format!("NMLS-{:06}", name.len() * 7919),
        contact_info: "sample contact redacted".to_string(),
    }
}

fn demo_offer(rate_bps: u32, min_credit_score: u16, now: DateTime<Utc>) -> OfferTerms {
    OfferTerms {
        loan_type: LoanType::Fixed,
        interest_rate_bps: rate_bps,
        loan_term_months: 360,
        min_loan_amount: 75_000,
        max_loan_amount: 650_000,
        max_ltv_bps: 9_000,
        min_credit_score,
        min_income: 60_000,
        points_bps: 50,
        origination_fee_bps: 75,
        closing_cost_estimate: 4_500,
        apr_bps: rate_bps + 20,
        valid_until: now + Duration::days(30),
    }
}

fn factor_label(factor: &FactorKind) -> &'static str {
    match factor {
        FactorKind::OfferExpiredOrInactive => "offer unavailable",
        FactorKind::LoanAmount => "loan amount",
        FactorKind::CreditScore => "credit score",
        FactorKind::Income => "income",
        FactorKind::LoanToValue => "loan-to-value",
    }
}

fn format_rate(bps: u32) -> String {
    format!("{}.{:02}%", bps / 100, bps % 100)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formats_basis_points_as_percent() {
        assert_eq!(format_rate(550), "5.50%");
        assert_eq!(format_rate(5), "0.05%");
        assert_eq!(format_rate(10_000), "100.00%");
    }

    #[test]
    fn demo_runs_with_defaults() {
        run_demo(DemoArgs {
            loan_amount: 300_000,
            property_value: 400_000,
            credit_score: 705,
            skip_response: false,
        })
        .expect("demo completes");
    }

    #[test]
    fn quote_rejects_zero_term() {
        let err = run_quote(QuoteArgs {
            principal: 100_000,
            rate_bps: 500,
            term_months: 0,
        })
        .expect_err("zero term rejected");
        assert!(err.to_string().contains("loan term"));
    }
}
