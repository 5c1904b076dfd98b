use crate::infra::build_service;
use clap::Args;
use credit_underwriting::config::AppConfig;
use credit_underwriting::error::AppError;
use credit_underwriting::workflows::underwriting::{
    score_batch, DecisionReport, Direction, DocumentKind, DocumentSlot, EmiQuote, EmiRequest,
    EmploymentStatus, Gender, LoanDetailsInput, LoanType, MaritalStatus, NotificationStatus,
    PersonalInfoInput, ResidenceType, WizardSession,
};
use std::fs::File;
use std::io::{self, BufReader, BufWriter};
use std::path::PathBuf;

#[derive(Args, Debug)]
pub(crate) struct DemoArgs {
    /// CIBIL score reported on the loan details form.
    #[arg(long, default_value_t = 750)]
    pub(crate) cibil_score: i32,
    /// Requested loan amount in rupees.
    #[arg(long, default_value_t = 600_000.0)]
    pub(crate) loan_amount: f64,
    /// Declared annual income in rupees.
    #[arg(long, default_value_t = 1_200_000.0)]
    pub(crate) income: f64,
    /// Skip the document upload step.
    #[arg(long)]
    pub(crate) skip_documents: bool,
}

#[derive(Args, Debug)]
pub(crate) struct ScoreArgs {
    /// CSV file with one applicant per row.
    pub(crate) input: PathBuf,
    /// Destination for the annotated CSV (defaults to stdout).
    #[arg(long, short)]
    pub(crate) output: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub(crate) struct EmiArgs {
    /// Loan principal in rupees.
    #[arg(long)]
    pub(crate) principal: f64,
    /// Annual interest rate in percent.
    #[arg(long)]
    pub(crate) rate: f64,
    /// Tenure in months.
    #[arg(long)]
    pub(crate) months: u32,
}

/// Walk one applicant through every wizard stage with the baseline engine.
pub(crate) async fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let config = AppConfig::load()?.underwriting;
    let (service, notifier) = build_service(&config)?;
    let controller = service.controller();
    let mut session = WizardSession::new();

    println!("Credit underwriting demo (session {})", session.id);

    let personal = PersonalInfoInput {
        name: "Asha Rao".to_string(),
        applicant_age: 30,
        gender: Gender::Female,
        income_annum: args.income,
        email: "asha.rao@example.com".to_string(),
        phone: "9876543210".to_string(),
        address: Some("12 MG Road, Bengaluru".to_string()),
    };
    let saved = match controller.save_personal(&mut session, personal) {
        Ok(saved) => saved,
        Err(err) => {
            println!("- Personal information rejected: {err}");
            return Ok(());
        }
    };
    println!("- Registered applicant {}", saved.applicant_id);

    if let Err(err) = controller.navigate(&mut session, Direction::Next) {
        println!("- Navigation blocked: {err}");
        return Ok(());
    }

    let loan = LoanDetailsInput {
        marital_status: MaritalStatus::Single,
        employee_status: EmploymentStatus::Employed,
        residence_type: ResidenceType::Rented,
        cibil_score: args.cibil_score,
        loan_amount: args.loan_amount,
        loan_interest: 12.5,
        loan_type: LoanType::Personal,
        loan_purpose: "Wedding".to_string(),
        loan_term: 36,
        active_loans: 1,
    };
    match controller.save_loan(&mut session, loan) {
        Ok(saved) => println!(
            "- Loan details saved (loan is {:.1}% of annual income)",
            saved.loan_percent_income
        ),
        Err(err) => {
            println!("- Loan details rejected: {err}");
            return Ok(());
        }
    }

    if let Err(err) = controller.navigate(&mut session, Direction::Next) {
        println!("- Navigation blocked: {err}");
        return Ok(());
    }

    if !args.skip_documents {
        let documents = [
            (DocumentSlot::Aadhar, "Government of India\nAsha Rao\nDOB 1995"),
            (DocumentSlot::Pan, "Income Tax Department\nASHA RAO"),
            (DocumentSlot::Salary, "Payslip\nAsha Rao\nNet pay 100000"),
        ];
        for (slot, text) in documents {
            match controller
                .upload_document(&mut session, slot, text.as_bytes(), DocumentKind::Image)
                .await
            {
                Ok(upload) if upload.extracted => println!(
                    "- {}: {} characters extracted",
                    slot.label(),
                    upload.characters
                ),
                Ok(upload) => println!(
                    "- {}: extraction skipped ({})",
                    slot.label(),
                    upload.warning.unwrap_or_default()
                ),
                Err(err) => println!("- {}: upload refused: {err}", slot.label()),
            }
        }
    }

    if let Err(err) = controller.navigate(&mut session, Direction::Next) {
        println!("- Navigation blocked: {err}");
        return Ok(());
    }

    match controller.submit(&mut session).await {
        Ok(report) => render_report(&report),
        Err(err) => println!("- Decision unavailable: {err}"),
    }

    for notice in notifier.sent() {
        println!("\nNotice to {}: {}", notice.recipient, notice.subject());
        println!("{}", notice.body());
    }

    Ok(())
}

fn render_report(report: &DecisionReport) {
    let outcome = &report.outcome;
    println!("\n{}", report.headline);
    if let Some(approval_id) = &outcome.approval_id {
        println!("Approval ID: {approval_id}");
    }
    if let Some(probability) = outcome.approval_probability {
        println!("Approval probability: {:.1}%", probability * 100.0);
    }
    if let Some(reason) = &outcome.reason {
        println!("Reason: {reason}");
    }
    if !outcome.tips.is_empty() {
        println!("Tips to improve your CIBIL score:");
        for tip in &outcome.tips {
            println!("  - {tip}");
        }
    }
    match &report.notification {
        NotificationStatus::Sent { recipient } => println!("Notification sent to {recipient}"),
        NotificationStatus::Failed { reason } => println!("Notification failed: {reason}"),
        NotificationStatus::Pending => println!("Notification status unknown"),
    }
}

/// Score a CSV file of applicants and write the annotated rows.
pub(crate) fn run_score(args: ScoreArgs) -> Result<(), AppError> {
    let config = AppConfig::load()?.underwriting;
    let (service, _) = build_service(&config)?;
    let engine = service.controller().engine();
    let input = BufReader::new(File::open(&args.input)?);

    let summary = match &args.output {
        Some(path) => {
            let output = BufWriter::new(File::create(path)?);
            score_batch(engine, input, output)?
        }
        None => score_batch(engine, input, io::stdout().lock())?,
    };

    eprintln!(
        "Scored {} rows: {} approved, {} rejected, {} invalid, {} errored",
        summary.rows, summary.approved, summary.rejected, summary.invalid, summary.errored
    );
    Ok(())
}

pub(crate) fn run_emi(args: EmiArgs) -> Result<(), AppError> {
    let quote = EmiQuote::compute(EmiRequest {
        principal: args.principal,
        annual_rate_percent: args.rate,
        months: args.months,
    })?;

    println!("Monthly installment: {:.2}", quote.monthly_installment);
    println!("Total payment: {:.2}", quote.total_payment);
    println!("Total interest: {:.2}", quote.total_interest);
    Ok(())
}
