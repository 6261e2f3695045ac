//! Reminder message templates (email and push)

use std::collections::BTreeMap;

use super::email::EmailMessage;
use crate::models::{capitalize, Timing};

/// Escape text for inclusion in HTML
pub fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#x27;"),
            _ => out.push(c),
        }
    }
    out
}

/// Medication reminder email for one dose
pub fn reminder_email(to: &str, medicine_name: &str, dosage: &str, timing: &str) -> EmailMessage {
    let schedule = capitalize(timing);
    let subject = format!("MediMind — {} Reminder: {}", schedule, medicine_name);

    let text = format!(
        "MediMind — Medication Reminder\n\n\
         {schedule} Reminder\n\n\
         Medicine: {medicine_name}\n\
         Dosage: {dosage}\n\
         Schedule: {schedule}\n\n\
         Take your medication as prescribed.\n\n\
         MediMind\n\
         AI-Powered Prescription Management\n\
         This is an automated reminder."
    );

    // Unknown timings borrow the morning styling
    let style = Timing::parse(timing).unwrap_or(Timing::Morning);
    let html = reminder_html(
        style.accent_color(),
        style.label(),
        &escape_html(timing),
        &escape_html(medicine_name),
        &escape_html(dosage),
        &escape_html(&schedule),
    );

    EmailMessage {
        to: to.to_string(),
        subject,
        text,
        html: Some(html),
    }
}

fn reminder_html(
    accent: &str,
    label: &str,
    timing: &str,
    medicine: &str,
    dosage: &str,
    schedule: &str,
) -> String {
    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="UTF-8">
<meta name="viewport" content="width=device-width, initial-scale=1.0">
<title>MediMind Reminder</title>
</head>
<body style="margin:0;padding:0;background-color:#f7f5f2;font-family:-apple-system,BlinkMacSystemFont,'Segoe UI',Roboto,'Helvetica Neue',Arial,sans-serif;">
<table role="presentation" width="100%" cellpadding="0" cellspacing="0" border="0" style="background-color:#f7f5f2;">
<tr><td align="center" style="padding:40px 16px;">
<table role="presentation" width="520" cellpadding="0" cellspacing="0" border="0" style="max-width:520px;width:100%;background-color:#ffffff;border-radius:12px;overflow:hidden;box-shadow:0 1px 3px rgba(0,0,0,0.06);">
  <tr><td style="height:4px;background-color:{accent};font-size:0;line-height:0;">&nbsp;</td></tr>
  <tr>
    <td style="padding:32px 36px 0 36px;">
      <table role="presentation" width="100%" cellpadding="0" cellspacing="0" border="0">
        <tr>
          <td><span style="font-size:18px;font-weight:700;color:#1a1a1a;letter-spacing:-0.3px;">MediMind</span></td>
          <td style="text-align:right;">
            <span style="display:inline-block;background-color:#FFF7ED;color:{accent};font-size:11px;font-weight:600;padding:4px 10px;border-radius:20px;text-transform:uppercase;">{label}</span>
          </td>
        </tr>
      </table>
    </td>
  </tr>
  <tr><td style="padding:20px 36px 0 36px;"><div style="height:1px;background-color:#f0ebe6;"></div></td></tr>
  <tr>
    <td style="padding:24px 36px 0 36px;">
      <h1 style="margin:0;font-size:22px;font-weight:700;color:#1a1a1a;line-height:1.3;">Medication Reminder</h1>
      <p style="margin:6px 0 0 0;font-size:14px;color:#78716C;line-height:1.5;">Your scheduled {timing} dose is due.</p>
    </td>
  </tr>
  <tr>
    <td style="padding:20px 36px 0 36px;">
      <table role="presentation" width="100%" cellpadding="0" cellspacing="0" border="0" style="background-color:#FAFAF9;border:1px solid #F0EBE6;border-radius:10px;">
        <tr>
          <td style="padding:16px 20px 12px 20px;">
            <p style="margin:0;font-size:11px;font-weight:600;color:#A8A29E;text-transform:uppercase;">Medicine</p>
            <p style="margin:4px 0 0 0;font-size:17px;font-weight:700;color:{accent};">{medicine}</p>
          </td>
        </tr>
        <tr><td style="padding:0 20px;"><div style="height:1px;background-color:#F0EBE6;"></div></td></tr>
        <tr>
          <td style="padding:12px 20px 16px 20px;">
            <table role="presentation" width="100%" cellpadding="0" cellspacing="0" border="0">
              <tr>
                <td width="50%" style="vertical-align:top;">
                  <p style="margin:0;font-size:11px;font-weight:600;color:#A8A29E;text-transform:uppercase;">Dosage</p>
                  <p style="margin:4px 0 0 0;font-size:15px;font-weight:600;color:#1C1917;">{dosage}</p>
                </td>
                <td width="50%" style="vertical-align:top;">
                  <p style="margin:0;font-size:11px;font-weight:600;color:#A8A29E;text-transform:uppercase;">Schedule</p>
                  <p style="margin:4px 0 0 0;font-size:15px;font-weight:600;color:#1C1917;">{schedule}</p>
                </td>
              </tr>
            </table>
          </td>
        </tr>
      </table>
    </td>
  </tr>
  <tr>
    <td style="padding:20px 36px 0 36px;">
      <p style="margin:0;font-size:13px;color:#78716C;line-height:1.6;">Take your medication as prescribed by your doctor. Consistency is key to effective treatment.</p>
    </td>
  </tr>
  <tr><td style="padding:32px 36px 0 36px;"><div style="height:1px;background-color:#f0ebe6;"></div></td></tr>
  <tr>
    <td style="padding:20px 36px 28px 36px;">
      <table role="presentation" width="100%" cellpadding="0" cellspacing="0" border="0">
        <tr>
          <td>
            <p style="margin:0;font-size:12px;font-weight:600;color:#D6D3D1;">MediMind</p>
            <p style="margin:2px 0 0 0;font-size:11px;color:#D6D3D1;line-height:1.5;">AI-Powered Prescription Management</p>
          </td>
          <td style="text-align:right;vertical-align:bottom;">
            <p style="margin:0;font-size:10px;color:#D6D3D1;">Automated reminder</p>
          </td>
        </tr>
      </table>
    </td>
  </tr>
</table>
</td></tr>
</table>
</body>
</html>"#
    )
}

/// Title, body and data map of a reminder push notification
pub struct PushContent {
    pub title: String,
    pub body: String,
    pub data: BTreeMap<String, String>,
}

pub fn reminder_push(medicine_name: &str, dosage: &str, timing: &str) -> PushContent {
    let mut data = BTreeMap::new();
    data.insert("type".to_string(), "medication_reminder".to_string());
    data.insert("medicine_name".to_string(), medicine_name.to_string());
    data.insert("dosage".to_string(), dosage.to_string());
    data.insert("timing".to_string(), timing.to_string());
    data.insert("screen".to_string(), "dashboard".to_string());

    PushContent {
        title: format!("💊 Time for your {}", medicine_name),
        body: format!("Take {} now ({}).", dosage, capitalize(timing)),
        data,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reminder_email_subject_and_text() {
        let email = reminder_email("a@b.co", "Paracetamol", "500mg", "evening");
        assert_eq!(email.subject, "MediMind — Evening Reminder: Paracetamol");
        assert!(email.text.contains("Medicine: Paracetamol\nDosage: 500mg\nSchedule: Evening"));

        let html = email.html.unwrap();
        assert!(html.contains("#C2410C"));
        assert!(html.contains(">Evening</span>"));
    }

    #[test]
    fn test_unknown_timing_uses_morning_style() {
        let html = reminder_email("a@b.co", "X", "1", "bedtime").html.unwrap();
        assert!(html.contains("#E8590C"));
        assert!(html.contains(">Morning</span>"));
        assert!(html.contains("Your scheduled bedtime dose is due."));
    }

    #[test]
    fn test_user_values_are_escaped() {
        let html = reminder_email("a@b.co", "<script>alert(1)</script>", "5 & 10", "night")
            .html
            .unwrap();
        assert!(!html.contains("<script>"));
        assert!(html.contains("&lt;script&gt;"));
        assert!(html.contains("5 &amp; 10"));
    }

    #[test]
    fn test_medicine_name_with_markup_characters() {
        assert_eq!(
            escape_html(r#"A&B <"Forte"> 'XR'"#),
            "A&amp;B &lt;&quot;Forte&quot;&gt; &#x27;XR&#x27;"
        );

        let email = reminder_email("a@b.co", r#"Tom & Jerry's <"Syrup">"#, "5ml", "evening");
        let html = email.html.unwrap();
        assert!(html.contains("Tom &amp; Jerry&#x27;s &lt;&quot;Syrup&quot;&gt;"));
        assert!(!html.contains(r#"<"Syrup">"#));
        // Plain-text parts are left as written
        assert!(email.subject.ends_with(r#"Tom & Jerry's <"Syrup">"#));
        assert!(email.text.contains(r#"Medicine: Tom & Jerry's <"Syrup">"#));
    }

    #[test]
    fn test_reminder_push() {
        let push = reminder_push("Dolo", "650mg", "night");
        assert_eq!(push.title, "💊 Time for your Dolo");
        assert_eq!(push.body, "Take 650mg now (Night).");
        assert_eq!(push.data["type"], "medication_reminder");
        assert_eq!(push.data["screen"], "dashboard");
        assert_eq!(push.data.len(), 5);
    }
}
