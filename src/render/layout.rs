//! Format-independent salary slip layout.

use rust_decimal::Decimal;

use super::SlipContext;
use crate::domain::{amount_in_words, format_amount};

/// One vertical block of the document, top to bottom.
#[derive(Debug, Clone, PartialEq)]
pub enum Block {
    /// Large centred heading
    Title(String),
    /// Small centred line under the title
    Subtitle(String),
    /// Horizontal rule with the given stroke width in points
    Rule(f32),
    /// Section heading
    Heading(String),
    /// Two labelled values side by side
    Pair(String, String),
    /// Single labelled value
    Field(String),
    /// Table header row
    ColumnHeader { left: String, right: String },
    /// Itemised amount, indented under a heading
    Item { label: String, amount: String },
    /// Bold total in the right-hand columns
    Total {
        label: String,
        amount: String,
        emphasis: bool,
    },
    /// Wrapped free text
    Paragraph(String),
    /// Small print line
    Footer(String),
    /// Small print, centred
    CenteredFooter(String),
    /// Vertical gap in millimetres
    Gap(f32),
}

/// Amount column text; the built-in PDF fonts have no rupee glyph.
pub fn money(value: Decimal) -> String {
    format!("Rs. {}", format_amount(value))
}

fn or_na(value: Option<&str>) -> &str {
    value.filter(|v| !v.trim().is_empty()).unwrap_or("N/A")
}

/// Blocks for one salary slip in print order. Gross and net are the stored
/// figures.
pub fn slip_layout(context: &SlipContext) -> Vec<Block> {
    let slip = &context.slip;
    let employee = &context.employee;
    let mut blocks = Vec::new();

    blocks.push(Block::Title(context.company_name.clone()));
    blocks.push(Block::Subtitle("Salary Slip".to_string()));
    blocks.push(Block::Rule(1.0));

    blocks.push(Block::Heading("Employee Information".to_string()));
    blocks.push(Block::Pair(
        format!("Name: {}", employee.name),
        format!("Employee ID: {}", employee.code_or_placeholder()),
    ));
    blocks.push(Block::Pair(
        format!("Department: {}", or_na(employee.department.as_deref())),
        format!("Position: {}", or_na(employee.position.as_deref())),
    ));
    blocks.push(Block::Field(format!("Email: {}", employee.email)));
    blocks.push(Block::Gap(6.0));

    blocks.push(Block::Heading("Salary Period".to_string()));
    blocks.push(Block::Pair(
        format!("Month: {}", slip.period().month_name()),
        format!("Year: {}", slip.year),
    ));
    blocks.push(Block::Field(format!(
        "Working Days: {} / {}",
        slip.working_days.worked, slip.working_days.total
    )));
    blocks.push(Block::Gap(8.0));

    blocks.push(Block::Heading("Salary Details".to_string()));
    blocks.push(Block::ColumnHeader {
        left: "Description".to_string(),
        right: "Amount (Rs.)".to_string(),
    });
    blocks.push(Block::Rule(1.5));

    let pro_rated = slip
        .breakdown()
        .map(|b| b.pro_rated_basic)
        .unwrap_or(slip.basic_salary);
    let total_allowances = slip.allowances.total();
    let total_deductions = slip.deductions.total();

    blocks.push(Block::Item {
        label: "Basic Salary (Pro-rated)".to_string(),
        amount: money(pro_rated),
    });

    blocks.push(Block::Heading("Allowances:".to_string()));
    for (label, value) in slip.allowances.components() {
        if value > Decimal::ZERO {
            blocks.push(Block::Item {
                label: format!("  {}", label),
                amount: money(value),
            });
        }
    }
    if total_allowances > Decimal::ZERO {
        blocks.push(Block::Total {
            label: "Total Allowances".to_string(),
            amount: money(total_allowances),
            emphasis: false,
        });
    }

    blocks.push(Block::Rule(0.75));
    blocks.push(Block::Total {
        label: "Gross Salary".to_string(),
        amount: money(slip.gross_salary),
        emphasis: false,
    });
    blocks.push(Block::Gap(3.0));

    blocks.push(Block::Heading("Deductions:".to_string()));
    for (label, value) in slip.deductions.components() {
        if value > Decimal::ZERO {
            blocks.push(Block::Item {
                label: format!("  {}", label),
                amount: money(value),
            });
        }
    }
    if total_deductions > Decimal::ZERO {
        blocks.push(Block::Total {
            label: "Total Deductions".to_string(),
            amount: money(total_deductions),
            emphasis: false,
        });
    }

    blocks.push(Block::Rule(1.5));
    blocks.push(Block::Total {
        label: "Net Salary".to_string(),
        amount: money(slip.net_salary),
        emphasis: true,
    });
    blocks.push(Block::Gap(6.0));

    blocks.push(Block::Heading("Amount in Words:".to_string()));
    blocks.push(Block::Paragraph(amount_in_words(slip.net_salary)));

    let bank = &employee.bank_details;
    if let Some(account_number) = bank.account_number.as_deref() {
        blocks.push(Block::Gap(8.0));
        blocks.push(Block::Heading("Bank Details".to_string()));
        blocks.push(Block::Field(format!("Account Number: {}", account_number)));
        blocks.push(Block::Field(format!(
            "Bank Name: {}",
            or_na(bank.bank_name.as_deref())
        )));
        blocks.push(Block::Field(format!(
            "IFSC Code: {}",
            or_na(bank.ifsc_code.as_deref())
        )));
    }

    if let Some(notes) = slip.notes.as_deref() {
        blocks.push(Block::Gap(6.0));
        blocks.push(Block::Heading("Notes:".to_string()));
        blocks.push(Block::Paragraph(notes.to_string()));
    }

    blocks.push(Block::Gap(14.0));
    blocks.push(Block::Footer(format!(
        "Generated on: {}    Generated by: {}",
        context.generated_at.format("%d/%m/%Y %H:%M UTC"),
        context.generated_by
    )));
    blocks.push(Block::CenteredFooter(
        "This is a computer generated salary slip and does not require signature.".to_string(),
    ));

    blocks
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{
        Account, Allowances, BankDetails, BaseSalary, Deductions, Role, SalarySlip, SlipStatus,
        WorkingDays,
    };
    use chrono::{NaiveDate, TimeZone, Utc};
    use rust_decimal_macros::dec;
    use uuid::Uuid;

    fn context(bank: BankDetails, notes: Option<&str>) -> SlipContext {
        let now = Utc.with_ymd_and_hms(2024, 7, 1, 9, 30, 0).unwrap();
        let employee = Account {
            id: Uuid::new_v4(),
            name: "Asha Verma".to_string(),
            email: "asha@example.com".to_string(),
            password_hash: String::new(),
            role: Role::Employee,
            employee_code: Some("EMP0001".to_string()),
            department: Some("Engineering".to_string()),
            position: None,
            joining_date: NaiveDate::from_ymd_opt(2023, 1, 2).unwrap(),
            salary: BaseSalary::default(),
            bank_details: bank,
            is_active: true,
            last_login_at: None,
            created_at: now,
            updated_at: now,
        };
        let slip = SalarySlip {
            id: Uuid::new_v4(),
            employee_id: employee.id,
            month: 6,
            year: 2024,
            basic_salary: dec!(50000),
            allowances: Allowances {
                hra: dec!(20000),
                ..Allowances::default()
            },
            deductions: Deductions {
                tax: dec!(5000),
                ..Deductions::default()
            },
            working_days: WorkingDays {
                total: 22,
                worked: 22,
            },
            status: SlipStatus::Finalized,
            generated_by: Uuid::new_v4(),
            gross_salary: dec!(70000),
            net_salary: dec!(65000),
            document_path: None,
            notes: notes.map(str::to_string),
            finalized_at: Some(now),
            sent_at: None,
            created_at: now,
            updated_at: now,
        };
        SlipContext {
            slip,
            employee,
            generated_by: "Admin User".to_string(),
            company_name: "ACME PAYROLL".to_string(),
            generated_at: now,
        }
    }

    fn has(blocks: &[Block], needle: &str) -> bool {
        blocks.iter().any(|b| format!("{:?}", b).contains(needle))
    }

    #[test]
    fn test_layout_sections() {
        let blocks = slip_layout(&context(BankDetails::default(), None));

        assert_eq!(blocks[0], Block::Title("ACME PAYROLL".to_string()));
        assert!(has(&blocks, "Employee ID: EMP0001"));
        assert!(has(&blocks, "Position: N/A"));
        assert!(has(&blocks, "Month: June"));
        assert!(has(&blocks, "Working Days: 22 / 22"));
        assert!(has(&blocks, "Rs. 20,000.00"));
        assert!(has(&blocks, "Sixty Five Thousand Rupees Only"));
        assert!(blocks.contains(&Block::Total {
            label: "Net Salary".to_string(),
            amount: "Rs. 65,000.00".to_string(),
            emphasis: true,
        }));
        assert!(!has(&blocks, "Bank Details"));
        assert!(!has(&blocks, "Notes:"));
    }

    #[test]
    fn test_zero_components_are_omitted() {
        let blocks = slip_layout(&context(BankDetails::default(), None));
        assert!(!has(&blocks, "Transport"));
        assert!(!has(&blocks, "Insurance"));
    }

    #[test]
    fn test_bank_details_and_notes_when_present() {
        let bank = BankDetails {
            account_number: Some("1234567890".to_string()),
            bank_name: None,
            ifsc_code: Some("SBIN0001234".to_string()),
        };
        let blocks = slip_layout(&context(bank, Some("Includes arrears")));

        assert!(has(&blocks, "Account Number: 1234567890"));
        assert!(has(&blocks, "Bank Name: N/A"));
        assert!(has(&blocks, "IFSC Code: SBIN0001234"));
        assert!(blocks.contains(&Block::Paragraph("Includes arrears".to_string())));
    }

    #[test]
    fn test_footer_is_small_print() {
        let blocks = slip_layout(&context(BankDetails::default(), None));
        let n = blocks.len();
        assert!(matches!(
            &blocks[n - 2],
            Block::Footer(text) if text.contains("Generated by: Admin User")
        ));
        assert!(matches!(&blocks[n - 1], Block::CenteredFooter(_)));
    }
}
