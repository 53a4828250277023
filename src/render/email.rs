//! Salary slip email body.

use chrono::Datelike;

use super::SlipContext;
use crate::domain::format_inr;

/// Subject and HTML body of a salary slip email.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlipEmail {
    pub subject: String,
    pub html: String,
}

/// Minimal HTML escaping for text interpolated into the template.
fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

pub fn salary_slip_email(context: &SlipContext) -> SlipEmail {
    let slip = &context.slip;
    let employee = &context.employee;
    let period = slip.period();
    let month = period.month_name();

    let notes = slip
        .notes
        .as_deref()
        .map(|notes| {
            format!(
                r#"
            <div class="details">
                <h3>Notes</h3>
                <p>{}</p>
            </div>"#,
                escape(notes)
            )
        })
        .unwrap_or_default();

    let html = format!(
        r#"<!DOCTYPE html>
<html>
<head>
    <meta charset="utf-8">
    <title>Salary Slip</title>
    <style>
        body {{ font-family: Arial, sans-serif; line-height: 1.6; color: #333; }}
        .container {{ max-width: 600px; margin: 0 auto; padding: 20px; }}
        .header {{ background-color: #f8f9fa; padding: 20px; text-align: center; border-radius: 5px; }}
        .content {{ padding: 20px 0; }}
        .details {{ background-color: #f8f9fa; padding: 15px; border-radius: 5px; margin: 15px 0; }}
        .footer {{ margin-top: 30px; padding-top: 20px; border-top: 1px solid #ddd; font-size: 12px; color: #666; }}
        .amount {{ font-size: 18px; font-weight: bold; color: #28a745; }}
    </style>
</head>
<body>
    <div class="container">
        <div class="header">
            <h2>Salary Slip</h2>
            <p>{month} {year}</p>
        </div>
        <div class="content">
            <p>Dear {name},</p>
            <p>Your salary slip for {month} {year} has been generated and is attached to this email.</p>
            <div class="details">
                <h3>Salary Summary</h3>
                <p><strong>Employee ID:</strong> {code}</p>
                <p><strong>Department:</strong> {department}</p>
                <p><strong>Working Days:</strong> {worked} / {total}</p>
                <p><strong>Net Salary:</strong> <span class="amount">{net}</span></p>
            </div>{notes}
            <p>Please find your detailed salary slip attached as a PDF document.</p>
            <p>If you have any questions regarding your salary slip, please contact the HR department.</p>
        </div>
        <div class="footer">
            <p>This is an automated email. Please do not reply to this message.</p>
            <p>&copy; {current_year} {company}</p>
        </div>
    </div>
</body>
</html>
"#,
        month = month,
        year = slip.year,
        name = escape(&employee.name),
        code = escape(employee.code_or_placeholder()),
        department = escape(employee.department.as_deref().unwrap_or("N/A")),
        worked = slip.working_days.worked,
        total = slip.working_days.total,
        net = format_inr(slip.net_salary),
        notes = notes,
        current_year = context.generated_at.year(),
        company = escape(&context.company_name),
    );

    SlipEmail {
        subject: format!("Salary Slip - {} {}", month, slip.year),
        html,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape() {
        assert_eq!(
            escape(r#"<b>"Tom" & 'Jerry'</b>"#),
            "&lt;b&gt;&quot;Tom&quot; &amp; &#39;Jerry&#39;&lt;/b&gt;"
        );
        assert_eq!(escape("plain"), "plain");
    }
}
