use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Lowest credit score a bureau report can carry.
pub const CREDIT_SCORE_FLOOR: u16 = 300;
/// Highest credit score a bureau report can carry.
pub const CREDIT_SCORE_CEILING: u16 = 850;
/// 100% expressed in basis points.
pub const BASIS_POINTS: u32 = 10_000;
/// Longest amortization schedule accepted on offers and applications (40 years).
pub const MAX_LOAN_TERM_MONTHS: u32 = 480;
/// Reputation assigned to newly registered lenders.
pub const MAX_REPUTATION: u8 = 100;

/// Opaque identity of any caller acting on the marketplace.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ActorId(pub String);

impl fmt::Display for ActorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Identity of a lender; shares the actor key space.
pub type LenderId = ActorId;
/// Identity of a borrower; shares the actor key space.
pub type BorrowerId = ActorId;

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct OfferId(pub u64);

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct ApplicationId(pub u64);

impl fmt::Display for OfferId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "offer-{}", self.0)
    }
}

impl fmt::Display for ApplicationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "application-{}", self.0)
    }
}

/// Registered lender with its reputation and completed-loan statistics.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Lender {
    pub id: LenderId,
    pub name: String,
    pub license_number: String,
    pub contact_info: String,
    pub is_approved: bool,
    pub reputation_score: u8,
    pub total_loans_issued: u32,
    pub average_rate_bps: u32,
    pub registered_at: DateTime<Utc>,
}

impl Lender {
    /// Folds a completed loan into the running average rate.
    pub fn record_completed_loan(&mut self, rate_bps: u32) {
        let issued = u64::from(self.total_loans_issued);
        let weighted = u64::from(self.average_rate_bps) * issued + u64::from(rate_bps);
        self.total_loans_issued = self.total_loans_issued.saturating_add(1);
        self.average_rate_bps = (weighted / u64::from(self.total_loans_issued)) as u32;
    }

    pub fn adjust_reputation(&mut self, delta: i16) {
        let adjusted = i16::from(self.reputation_score).saturating_add(delta);
        self.reputation_score = adjusted.clamp(0, i16::from(MAX_REPUTATION)) as u8;
    }
}

/// Inbound payload used to register a lender.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LenderRegistration {
    pub name: String,
    pub license_number: String,
    pub contact_info: String,
}

/// Borrower-side profile tracking how many applications were filed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BorrowerProfile {
    pub id: BorrowerId,
    pub first_name: String,
    pub last_name: String,
    pub applications_count: u32,
    pub verified: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BorrowerRegistration {
    pub first_name: String,
    pub last_name: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoanType {
    Fixed,
    Adjustable,
}

/// Lender-authored terms; validated before they become an offer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OfferTerms {
    pub loan_type: LoanType,
    pub interest_rate_bps: u32,
    pub loan_term_months: u32,
    pub min_loan_amount: u64,
    pub max_loan_amount: u64,
    pub max_ltv_bps: u32,
    pub min_credit_score: u16,
    pub min_income: u64,
    pub points_bps: u32,
    pub origination_fee_bps: u32,
    pub closing_cost_estimate: u64,
    pub apr_bps: u32,
    pub valid_until: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MortgageOffer {
    pub id: OfferId,
    pub lender: LenderId,
    pub terms: OfferTerms,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

impl MortgageOffer {
    /// Whether the offer can still be matched at `now`.
    pub fn is_available(&self, now: DateTime<Utc>) -> bool {
        self.is_active && now <= self.terms.valid_until
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoanPurpose {
    Purchase,
    Refinance,
    CashOutRefinance,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PropertyType {
    SingleFamily,
    Condo,
    Townhouse,
    MultiFamily,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OccupancyType {
    Primary,
    SecondHome,
    Investment,
}

/// Borrower-authored request; validated before it becomes an application.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApplicationTerms {
    pub loan_amount: u64,
    pub property_value: u64,
    pub credit_score: u16,
    pub annual_income: u64,
    pub monthly_debt_payments: u64,
    pub loan_purpose: LoanPurpose,
    pub property_type: PropertyType,
    pub occupancy_type: OccupancyType,
    pub down_payment: u64,
    #[serde(default)]
    pub preferred_term_months: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MortgageApplication {
    pub id: ApplicationId,
    pub borrower: BorrowerId,
    pub terms: ApplicationTerms,
    pub debt_to_income_bps: u32,
    pub status: ApplicationStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl MortgageApplication {
    /// Term used for quotes: the borrower's preference, else the offer's.
    pub fn term_for(&self, offer: &MortgageOffer) -> u32 {
        self.terms
            .preferred_term_months
            .unwrap_or(offer.terms.loan_term_months)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApplicationStatus {
    Submitted,
    Matched,
    Approved,
    Rejected,
    Withdrawn,
}

impl ApplicationStatus {
    pub const fn label(self) -> &'static str {
        match self {
            ApplicationStatus::Submitted => "submitted",
            ApplicationStatus::Matched => "matched",
            ApplicationStatus::Approved => "approved",
            ApplicationStatus::Rejected => "rejected",
            ApplicationStatus::Withdrawn => "withdrawn",
        }
    }

    pub const fn is_terminal(self) -> bool {
        matches!(
            self,
            ApplicationStatus::Approved | ApplicationStatus::Rejected | ApplicationStatus::Withdrawn
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LenderResponse {
    Pending,
    Interested,
    Declined,
}

/// Snapshot pairing an application with an offer at match time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApplicationMatch {
    pub application_id: ApplicationId,
    pub offer_id: OfferId,
    pub match_score: u8,
    pub estimated_payment: u64,
    pub total_interest: u64,
    pub lender_response: LenderResponse,
    pub created_at: DateTime<Utc>,
}

/// Platform-wide counters and thresholds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlatformStats {
    pub total_lenders: u64,
    pub total_offers: u64,
    pub total_applications: u64,
    pub min_credit_score: u16,
    pub max_ltv_bps: u32,
    pub platform_fee_rate_bps: u32,
    pub paused: bool,
}

impl PlatformStats {
    pub fn new(min_credit_score: u16, max_ltv_bps: u32, platform_fee_rate_bps: u32) -> Self {
        Self {
            total_lenders: 0,
            total_offers: 0,
            total_applications: 0,
            min_credit_score,
            max_ltv_bps,
            platform_fee_rate_bps,
            paused: false,
        }
    }

    pub fn parameters(&self) -> PlatformParameters {
        PlatformParameters {
            min_credit_score: self.min_credit_score,
            max_ltv_bps: self.max_ltv_bps,
            platform_fee_rate_bps: self.platform_fee_rate_bps,
        }
    }
}

/// Owner-adjustable thresholds applied at application intake.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlatformParameters {
    pub min_credit_score: u16,
    pub max_ltv_bps: u32,
    pub platform_fee_rate_bps: u32,
}
