use serde::Serialize;

struct FaqEntry {
    topic: &'static str,
    keywords: &'static [&'static str],
    answer: &'static str,
}

const FAQ_ENTRIES: &[FaqEntry] = &[
    FaqEntry {
        topic: "eligibility",
        keywords: &["eligible", "eligibility", "qualify", "age"],
        answer: "Applicants aged 18 to 70 with a regular income can apply. The requested amount must stay below ten times your annual income.",
    },
    FaqEntry {
        topic: "documents",
        keywords: &["document", "upload", "aadhar", "aadhaar", "pan", "salary slip"],
        answer: "Upload your Aadhar card, PAN card and latest salary slip. The name on your identity documents must match the name on your application.",
    },
    FaqEntry {
        topic: "cibil",
        keywords: &["cibil", "credit score", "score"],
        answer: "CIBIL scores range from 300 to 900. Scores of 700 and above improve your chances of approval.",
    },
    FaqEntry {
        topic: "emi",
        keywords: &["emi", "installment", "instalment", "monthly payment"],
        answer: "Use the EMI calculator with your loan amount, interest rate and tenure to estimate your monthly installment.",
    },
    FaqEntry {
        topic: "interest",
        keywords: &["interest", "rate"],
        answer: "Interest rates between 1% and 30% per annum are accepted, depending on the loan type and your credit profile.",
    },
    FaqEntry {
        topic: "processing_time",
        keywords: &["how long", "processing", "time", "when"],
        answer: "Decisions are rendered as soon as you submit the final step, and a confirmation e-mail follows shortly after.",
    },
    FaqEntry {
        topic: "status",
        keywords: &["status", "approval id", "applicant id", "track"],
        answer: "Your applicant ID is issued when you save personal information. Approved applications also receive an approval ID by e-mail.",
    },
];

const FALLBACK_ANSWER: &str =
    "I can help with eligibility, documents, CIBIL scores, EMI, interest rates, processing time and application status.";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FaqAnswer {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub topic: Option<&'static str>,
    pub answer: &'static str,
}

/// Canned FAQ responder matching questions by keyword.
#[derive(Debug, Clone, Copy, Default)]
pub struct FaqResponder;

impl FaqResponder {
    /// Answer with the entry matching the most keywords; ties go to the earlier entry.
    pub fn answer(&self, question: &str) -> FaqAnswer {
        let question = question.to_lowercase();
        let best = FAQ_ENTRIES
            .iter()
            .map(|entry| {
                let hits = entry
                    .keywords
                    .iter()
                    .filter(|keyword| question.contains(**keyword))
                    .count();
                (hits, entry)
            })
            .filter(|(hits, _)| *hits > 0)
            .fold(None::<(usize, &FaqEntry)>, |best, candidate| match best {
                Some((hits, _)) if hits >= candidate.0 => best,
                _ => Some(candidate),
            });

        match best {
            Some((_, entry)) => FaqAnswer {
                topic: Some(entry.topic),
                answer: entry.answer,
            },
            None => FaqAnswer {
                topic: None,
                answer: FALLBACK_ANSWER,
            },
        }
    }

    pub fn topics(&self) -> Vec<&'static str> {
        FAQ_ENTRIES.iter().map(|entry| entry.topic).collect()
    }
}
