//! Salary slips: pay computation, period rules and the draft → finalized → sent lifecycle.
//!
//! Pro-rating is exact (`basic × worked / total` at full decimal precision).
//! The pro-rated basic is then rounded once to cents, half away from zero,
//! and every later figure is an exact cent sum, so `net == gross − deductions`
//! holds for stored values. Negative net pay is kept as computed.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use utoipa::ToSchema;
use uuid::Uuid;

use super::money::{ensure_cents, max_stored_amount, round_money};
use crate::config::{MAX_SLIP_NOTES_LENGTH, MAX_WORKING_DAYS, MIN_SALARY_YEAR};
use crate::errors::{AppError, AppResult};

const MONTH_NAMES: [&str; 12] = [
    "January",
    "February",
    "March",
    "April",
    "May",
    "June",
    "July",
    "August",
    "September",
    "October",
    "November",
    "December",
];

/// Full English month name for 1..=12.
pub fn month_name(month: u32) -> &'static str {
    month
        .checked_sub(1)
        .and_then(|i| MONTH_NAMES.get(i as usize))
        .copied()
        .unwrap_or("Unknown")
}

// =============================================================================
// Components
// =============================================================================

/// Named allowance components. `other` is the catch-all.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase", default)]
pub struct Allowances {
    #[schema(value_type = f64, example = 20000.0)]
    pub hra: Decimal,
    #[schema(value_type = f64)]
    pub transport: Decimal,
    #[schema(value_type = f64)]
    pub medical: Decimal,
    #[schema(value_type = f64)]
    pub special: Decimal,
    #[schema(value_type = f64)]
    pub other: Decimal,
}

impl Allowances {
    /// Labelled components in display order.
    pub fn components(&self) -> [(&'static str, Decimal); 5] {
        [
            ("HRA", self.hra),
            ("Transport", self.transport),
            ("Medical", self.medical),
            ("Special", self.special),
            ("Other", self.other),
        ]
    }

    /// Sum of positive components.
    pub fn total(&self) -> Decimal {
        positive_sum(&self.components())
    }

    pub fn validate(&self) -> AppResult<()> {
        validate_components("allowance", &self.components())
    }

    pub fn merge(self, patch: &AllowancesPatch) -> Self {
        Self {
            hra: patch.hra.unwrap_or(self.hra),
            transport: patch.transport.unwrap_or(self.transport),
            medical: patch.medical.unwrap_or(self.medical),
            special: patch.special.unwrap_or(self.special),
            other: patch.other.unwrap_or(self.other),
        }
    }
}

/// Named deduction components. `other` is the catch-all.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase", default)]
pub struct Deductions {
    #[schema(value_type = f64, example = 5000.0)]
    pub tax: Decimal,
    #[schema(value_type = f64)]
    pub pf: Decimal,
    #[schema(value_type = f64)]
    pub insurance: Decimal,
    #[schema(value_type = f64)]
    pub other: Decimal,
}

impl Deductions {
    pub fn components(&self) -> [(&'static str, Decimal); 4] {
        [
            ("Tax", self.tax),
            ("PF", self.pf),
            ("Insurance", self.insurance),
            ("Other", self.other),
        ]
    }

    /// Sum of positive components.
    pub fn total(&self) -> Decimal {
        positive_sum(&self.components())
    }

    pub fn validate(&self) -> AppResult<()> {
        validate_components("deduction", &self.components())
    }

    pub fn merge(self, patch: &DeductionsPatch) -> Self {
        Self {
            tax: patch.tax.unwrap_or(self.tax),
            pf: patch.pf.unwrap_or(self.pf),
            insurance: patch.insurance.unwrap_or(self.insurance),
            other: patch.other.unwrap_or(self.other),
        }
    }
}

/// Partial allowance update; unspecified components keep their value.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AllowancesPatch {
    #[schema(value_type = Option<f64>)]
    pub hra: Option<Decimal>,
    #[schema(value_type = Option<f64>)]
    pub transport: Option<Decimal>,
    #[schema(value_type = Option<f64>)]
    pub medical: Option<Decimal>,
    #[schema(value_type = Option<f64>)]
    pub special: Option<Decimal>,
    #[schema(value_type = Option<f64>)]
    pub other: Option<Decimal>,
}

/// Partial deduction update; unspecified components keep their value.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DeductionsPatch {
    #[schema(value_type = Option<f64>)]
    pub tax: Option<Decimal>,
    #[schema(value_type = Option<f64>)]
    pub pf: Option<Decimal>,
    #[schema(value_type = Option<f64>)]
    pub insurance: Option<Decimal>,
    #[schema(value_type = Option<f64>)]
    pub other: Option<Decimal>,
}

fn positive_sum(components: &[(&'static str, Decimal)]) -> Decimal {
    components
        .iter()
        .map(|(_, v)| *v)
        .filter(|v| v.is_sign_positive() && !v.is_zero())
        .sum()
}

fn validate_components(kind: &str, components: &[(&'static str, Decimal)]) -> AppResult<()> {
    for (label, value) in components {
        ensure_cents(&format!("{} {}", label, kind), *value)?;
    }
    Ok(())
}

// =============================================================================
// Period and working days
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct WorkingDays {
    #[schema(example = 22)]
    pub total: i32,
    #[schema(example = 20)]
    pub worked: i32,
}

impl WorkingDays {
    /// Total in 1..=31, worked in 0..=total.
    pub fn validate(&self) -> AppResult<()> {
        if !(1..=MAX_WORKING_DAYS).contains(&self.total) {
            return Err(AppError::validation(format!(
                "Total working days must be between 1 and {}",
                MAX_WORKING_DAYS
            )));
        }
        if self.worked < 0 {
            return Err(AppError::validation("Worked days cannot be negative"));
        }
        if self.worked > self.total {
            return Err(AppError::validation(
                "Worked days cannot exceed total working days",
            ));
        }
        Ok(())
    }
}

/// Month (1-12) and year a slip covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PayPeriod {
    pub month: u32,
    pub year: i32,
}

impl PayPeriod {
    /// Month 1..=12, year from 2020 through next year.
    pub fn new(month: u32, year: i32, current_year: i32) -> AppResult<Self> {
        if !(1..=12).contains(&month) {
            return Err(AppError::validation("Month must be between 1 and 12"));
        }
        let max_year = current_year + 1;
        if !(MIN_SALARY_YEAR..=max_year).contains(&year) {
            return Err(AppError::validation(format!(
                "Year must be between {} and {}",
                MIN_SALARY_YEAR, max_year
            )));
        }
        Ok(Self { month, year })
    }

    pub fn month_name(&self) -> &'static str {
        month_name(self.month)
    }
}

impl std::fmt::Display for PayPeriod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}", self.month_name(), self.year)
    }
}

// =============================================================================
// Calculation
// =============================================================================

/// `basic × worked / total` without rounding.
pub fn pro_rated_basic_exact(basic: Decimal, days: WorkingDays) -> AppResult<Decimal> {
    days.validate()?;
    basic
        .checked_mul(Decimal::from(days.worked))
        .and_then(|v| v.checked_div(Decimal::from(days.total)))
        .ok_or_else(|| AppError::validation("Basic salary is out of range"))
}

/// Every derived figure on a slip, in cents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SalaryBreakdown {
    #[schema(value_type = f64)]
    pub pro_rated_basic: Decimal,
    #[schema(value_type = f64)]
    pub total_allowances: Decimal,
    #[schema(value_type = f64)]
    pub gross_salary: Decimal,
    #[schema(value_type = f64)]
    pub total_deductions: Decimal,
    #[schema(value_type = f64)]
    pub net_salary: Decimal,
}

impl SalaryBreakdown {
    pub fn compute(
        basic: Decimal,
        allowances: &Allowances,
        deductions: &Deductions,
        days: WorkingDays,
    ) -> AppResult<Self> {
        let pro_rated_basic = round_money(pro_rated_basic_exact(basic, days)?);
        let total_allowances = allowances.total();
        let total_deductions = deductions.total();
        let gross_salary = pro_rated_basic + total_allowances;
        let net_salary = gross_salary - total_deductions;

        if gross_salary > max_stored_amount() || net_salary.abs() > max_stored_amount() {
            return Err(AppError::validation("Salary totals are out of range"));
        }

        Ok(Self {
            pro_rated_basic,
            total_allowances,
            gross_salary,
            total_deductions,
            net_salary,
        })
    }
}

// =============================================================================
// Slip lifecycle
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum SlipStatus {
    Draft,
    Finalized,
    Sent,
}

impl SlipStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SlipStatus::Draft => "draft",
            SlipStatus::Finalized => "finalized",
            SlipStatus::Sent => "sent",
        }
    }

    /// The only status a slip may move to next.
    pub fn next(&self) -> Option<SlipStatus> {
        match self {
            SlipStatus::Draft => Some(SlipStatus::Finalized),
            SlipStatus::Finalized => Some(SlipStatus::Sent),
            SlipStatus::Sent => None,
        }
    }
}

impl FromStr for SlipStatus {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "draft" => Ok(SlipStatus::Draft),
            "finalized" => Ok(SlipStatus::Finalized),
            "sent" => Ok(SlipStatus::Sent),
            other => Err(AppError::validation(format!(
                "Invalid salary slip status '{}'",
                other
            ))),
        }
    }
}

/// Salary slip domain entity
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SalarySlip {
    pub id: Uuid,
    pub employee_id: Uuid,
    #[schema(example = 6)]
    pub month: u32,
    #[schema(example = 2024)]
    pub year: i32,
    #[schema(value_type = f64, example = 50000.0)]
    pub basic_salary: Decimal,
    pub allowances: Allowances,
    pub deductions: Deductions,
    pub working_days: WorkingDays,
    pub status: SlipStatus,
    pub generated_by: Uuid,
    #[schema(value_type = f64)]
    pub gross_salary: Decimal,
    #[schema(value_type = f64)]
    pub net_salary: Decimal,
    /// Path of the rendered document relative to the upload root
    pub document_path: Option<String>,
    pub notes: Option<String>,
    pub finalized_at: Option<DateTime<Utc>>,
    pub sent_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl SalarySlip {
    pub fn period(&self) -> PayPeriod {
        PayPeriod {
            month: self.month,
            year: self.year,
        }
    }

    pub fn breakdown(&self) -> AppResult<SalaryBreakdown> {
        SalaryBreakdown::compute(
            self.basic_salary,
            &self.allowances,
            &self.deductions,
            self.working_days,
        )
    }

    pub fn is_draft(&self) -> bool {
        self.status == SlipStatus::Draft
    }

    pub fn ensure_draft(&self) -> AppResult<()> {
        if self.is_draft() {
            Ok(())
        } else {
            Err(AppError::conflict("Salary slip is no longer a draft"))
        }
    }

    pub fn ensure_status(&self, expected: SlipStatus) -> AppResult<()> {
        if self.status == expected {
            Ok(())
        } else {
            Err(AppError::conflict(format!(
                "Salary slip must be {} (currently {})",
                expected.as_str(),
                self.status.as_str()
            )))
        }
    }

    /// Stored document location, `salary-slips/salary-slip-EMP0001-6-2024.pdf`.
    pub fn document_file_name(&self, employee_code: &str) -> String {
        format!(
            "salary-slip-{}-{}-{}.pdf",
            employee_code, self.month, self.year
        )
    }

    /// Name offered to the browser, `SalarySlip_EMP0001_June_2024.pdf`.
    pub fn download_name(&self, employee_code: &str) -> String {
        format!(
            "SalarySlip_{}_{}_{}.pdf",
            employee_code,
            month_name(self.month),
            self.year
        )
    }
}

/// Validated input for a new slip.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlipInput {
    pub employee_id: Uuid,
    pub period: PayPeriod,
    pub basic_salary: Decimal,
    pub allowances: Allowances,
    pub deductions: Deductions,
    pub working_days: WorkingDays,
    pub notes: Option<String>,
}

impl SlipInput {
    pub fn validate(&self) -> AppResult<SalaryBreakdown> {
        ensure_cents("Basic salary", self.basic_salary)?;
        self.allowances.validate()?;
        self.deductions.validate()?;
        validate_notes(self.notes.as_deref())?;
        SalaryBreakdown::compute(
            self.basic_salary,
            &self.allowances,
            &self.deductions,
            self.working_days,
        )
    }
}

/// Insert payload handed to the salary slip store.
#[derive(Debug, Clone)]
pub struct NewSalarySlip {
    pub input: SlipInput,
    pub generated_by: Uuid,
    pub breakdown: SalaryBreakdown,
}

/// Partial update of a draft; component patches merge into the current values.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SlipChanges {
    pub basic_salary: Option<Decimal>,
    pub allowances: Option<AllowancesPatch>,
    pub deductions: Option<DeductionsPatch>,
    pub working_days: Option<WorkingDays>,
    pub notes: Option<String>,
}

/// The full set of editable figures after merging a change into a draft.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlipRevision {
    pub basic_salary: Decimal,
    pub allowances: Allowances,
    pub deductions: Deductions,
    pub working_days: WorkingDays,
    pub notes: Option<String>,
    pub breakdown: SalaryBreakdown,
}

impl SlipChanges {
    pub fn apply_to(&self, slip: &SalarySlip) -> AppResult<SlipRevision> {
        let basic_salary = self.basic_salary.unwrap_or(slip.basic_salary);
        let allowances = match &self.allowances {
            Some(patch) => slip.allowances.merge(patch),
            None => slip.allowances,
        };
        let deductions = match &self.deductions {
            Some(patch) => slip.deductions.merge(patch),
            None => slip.deductions,
        };
        let working_days = self.working_days.unwrap_or(slip.working_days);
        let notes = match &self.notes {
            Some(notes) => clean_notes(notes),
            None => slip.notes.clone(),
        };

        ensure_cents("Basic salary", basic_salary)?;
        allowances.validate()?;
        deductions.validate()?;
        validate_notes(notes.as_deref())?;
        let breakdown =
            SalaryBreakdown::compute(basic_salary, &allowances, &deductions, working_days)?;

        Ok(SlipRevision {
            basic_salary,
            allowances,
            deductions,
            working_days,
            notes,
            breakdown,
        })
    }
}

/// Trimmed notes, empty treated as absent.
pub fn clean_notes(notes: &str) -> Option<String> {
    let notes = notes.trim();
    (!notes.is_empty()).then(|| notes.to_string())
}

fn validate_notes(notes: Option<&str>) -> AppResult<()> {
    match notes {
        Some(n) if n.chars().count() > MAX_SLIP_NOTES_LENGTH => Err(AppError::validation(
            format!("Notes cannot exceed {} characters", MAX_SLIP_NOTES_LENGTH),
        )),
        _ => Ok(()),
    }
}

// =============================================================================
// Queries and statistics
// =============================================================================

#[derive(Debug, Clone, Default)]
pub struct SlipFilter {
    pub employee_id: Option<Uuid>,
    pub month: Option<u32>,
    pub year: Option<i32>,
    pub status: Option<SlipStatus>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SalaryOverview {
    pub total: u64,
    pub draft: u64,
    pub finalized: u64,
    pub sent: u64,
    #[schema(value_type = f64)]
    pub total_net_salary: Decimal,
    #[schema(value_type = f64)]
    pub current_year_net_salary: Decimal,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct MonthlyPayout {
    pub month: u32,
    pub count: u64,
    #[schema(value_type = f64)]
    pub total_net_salary: Decimal,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct YearlyPayout {
    pub year: i32,
    pub count: u64,
    #[schema(value_type = f64)]
    pub total_net_salary: Decimal,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SalaryStats {
    pub overview: SalaryOverview,
    /// Months of the current year
    pub monthly: Vec<MonthlyPayout>,
    /// Most recent year first
    pub yearly: Vec<YearlyPayout>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn days(total: i32, worked: i32) -> WorkingDays {
        WorkingDays { total, worked }
    }

    fn slip(allowances: Allowances, deductions: Deductions) -> SalarySlip {
        let now = Utc::now();
        SalarySlip {
            id: Uuid::new_v4(),
            employee_id: Uuid::new_v4(),
            month: 6,
            year: 2024,
            basic_salary: dec!(50000),
            allowances,
            deductions,
            working_days: days(22, 22),
            status: SlipStatus::Draft,
            generated_by: Uuid::new_v4(),
            gross_salary: dec!(0),
            net_salary: dec!(0),
            document_path: None,
            notes: None,
            finalized_at: None,
            sent_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_pro_rating_is_exact() {
        let exact = pro_rated_basic_exact(dec!(50000), days(22, 20)).unwrap();
        assert_eq!(exact.round_dp(6), dec!(45454.545455));
        assert!(exact > dec!(45454.5454) && exact < dec!(45454.5455));
    }

    #[test]
    fn test_pro_rated_basic_rounds_once_to_cents() {
        let breakdown = SalaryBreakdown::compute(
            dec!(50000),
            &Allowances::default(),
            &Deductions::default(),
            days(22, 20),
        )
        .unwrap();
        assert_eq!(breakdown.pro_rated_basic, dec!(45454.55));
        assert_eq!(breakdown.gross_salary, dec!(45454.55));
    }

    #[test]
    fn test_full_month_with_hra_and_tax() {
        let allowances = Allowances {
            hra: dec!(20000),
            ..Default::default()
        };
        let deductions = Deductions {
            tax: dec!(5000),
            ..Default::default()
        };
        let breakdown =
            SalaryBreakdown::compute(dec!(50000), &allowances, &deductions, days(22, 22)).unwrap();

        assert_eq!(breakdown.gross_salary, dec!(70000));
        assert_eq!(breakdown.total_deductions, dec!(5000));
        assert_eq!(breakdown.net_salary, dec!(65000));
    }

    #[test]
    fn test_net_equals_gross_minus_deductions_even_when_negative() {
        let allowances = Allowances {
            transport: dec!(1500.25),
            medical: dec!(999.99),
            ..Default::default()
        };
        let deductions = Deductions {
            tax: dec!(30000),
            pf: dec!(4000),
            insurance: dec!(1200.50),
            other: dec!(0.01),
        };
        let breakdown =
            SalaryBreakdown::compute(dec!(20000), &allowances, &deductions, days(30, 17)).unwrap();

        assert_eq!(
            breakdown.net_salary,
            breakdown.gross_salary - breakdown.total_deductions
        );
        assert!(breakdown.net_salary.is_sign_negative());
    }

    #[test]
    fn test_working_days_rules() {
        assert!(days(0, 0).validate().is_err());
        assert!(days(32, 1).validate().is_err());
        assert!(days(22, 23).validate().is_err());
        assert!(days(22, -1).validate().is_err());
        assert!(days(22, 0).validate().is_ok());
        assert!(pro_rated_basic_exact(dec!(50000), days(20, 21)).is_err());
    }

    #[test]
    fn test_pay_period_bounds() {
        assert!(PayPeriod::new(0, 2024, 2024).is_err());
        assert!(PayPeriod::new(13, 2024, 2024).is_err());
        assert!(PayPeriod::new(1, 2019, 2024).is_err());
        assert!(PayPeriod::new(1, 2026, 2024).is_err());
        assert_eq!(
            PayPeriod::new(6, 2025, 2024).unwrap().to_string(),
            "June 2025"
        );
    }

    #[test]
    fn test_status_order() {
        assert_eq!(SlipStatus::Draft.next(), Some(SlipStatus::Finalized));
        assert_eq!(SlipStatus::Finalized.next(), Some(SlipStatus::Sent));
        assert_eq!(SlipStatus::Sent.next(), None);
    }

    #[test]
    fn test_changes_merge_components() {
        let current = slip(
            Allowances {
                hra: dec!(20000),
                transport: dec!(1000),
                ..Default::default()
            },
            Deductions {
                tax: dec!(5000),
                ..Default::default()
            },
        );
        let changes = SlipChanges {
            allowances: Some(AllowancesPatch {
                transport: Some(dec!(2000)),
                ..Default::default()
            }),
            ..Default::default()
        };

        let revision = changes.apply_to(&current).unwrap();
        assert_eq!(revision.allowances.hra, dec!(20000));
        assert_eq!(revision.allowances.transport, dec!(2000));
        assert_eq!(revision.breakdown.gross_salary, dec!(72000));
        assert_eq!(revision.breakdown.net_salary, dec!(67000));
    }

    #[test]
    fn test_changes_reject_negative_component() {
        let current = slip(Allowances::default(), Deductions::default());
        let changes = SlipChanges {
            deductions: Some(DeductionsPatch {
                pf: Some(dec!(-10)),
                ..Default::default()
            }),
            ..Default::default()
        };
        assert!(changes.apply_to(&current).is_err());
    }

    #[test]
    fn test_file_names() {
        let slip = slip(Allowances::default(), Deductions::default());
        assert_eq!(
            slip.document_file_name("EMP0001"),
            "salary-slip-EMP0001-6-2024.pdf"
        );
        assert_eq!(slip.download_name("EMP0001"), "SalarySlip_EMP0001_June_2024.pdf");
    }

    #[test]
    fn test_month_name_out_of_range() {
        assert_eq!(month_name(1), "January");
        assert_eq!(month_name(12), "December");
        assert_eq!(month_name(0), "Unknown");
        assert_eq!(month_name(13), "Unknown");
    }
}
