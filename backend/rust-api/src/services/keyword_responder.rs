/// Canned-answer lookup for the chatbot and the legal-advice form.
///
/// Input is lower-cased and every keyword is tested for substring containment.
/// When several keywords match, the longest one wins; ties go to the entry
/// listed first. No match yields the default response.
#[derive(Debug, Clone)]
pub struct KeywordResponder {
    entries: Vec<KeywordEntry>,
    default_response: String,
}

#[derive(Debug, Clone)]
struct KeywordEntry {
    keyword: String,
    keyword_len: usize,
    response: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeywordReply<'a> {
    pub text: &'a str,
    /// `None` when the default response was used.
    pub keyword: Option<&'a str>,
}

impl KeywordResponder {
    pub fn new<K, R>(table: impl IntoIterator<Item = (K, R)>, default_response: impl Into<String>) -> Self
    where
        K: AsRef<str>,
        R: Into<String>,
    {
        let entries = table
            .into_iter()
            .filter_map(|(keyword, response)| {
                let keyword = keyword.as_ref().trim().to_lowercase();
                if keyword.is_empty() {
                    return None;
                }
                Some(KeywordEntry {
                    keyword_len: keyword.chars().count(),
                    keyword,
                    response: response.into(),
                })
            })
            .collect();

        Self {
            entries,
            default_response: default_response.into(),
        }
    }

    pub fn respond(&self, input: &str) -> KeywordReply<'_> {
        let haystack = input.to_lowercase();

        let mut best: Option<&KeywordEntry> = None;
        for entry in self.entries.iter().filter(|e| haystack.contains(&e.keyword)) {
            match best {
                Some(current) if current.keyword_len >= entry.keyword_len => {}
                _ => best = Some(entry),
            }
        }

        match best {
            Some(entry) => KeywordReply {
                text: &entry.response,
                keyword: Some(&entry.keyword),
            },
            None => KeywordReply {
                text: &self.default_response,
                keyword: None,
            },
        }
    }

    pub fn default_response(&self) -> &str {
        &self.default_response
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Responder behind the policy chatbot.
    pub fn policy_chatbot() -> Self {
        Self::new(POLICY_TABLE.iter().copied(), POLICY_DEFAULT)
    }

    /// Responder behind the legal-advice form.
    pub fn legal_advisor() -> Self {
        Self::new(LEGAL_TABLE.iter().copied(), LEGAL_DEFAULT)
    }
}

const POLICY_DEFAULT: &str = "I'm sorry, I don't have information about that topic yet. \
Try asking about healthcare, education, taxes, housing, pensions, employment, \
climate, immigration or voting.";

const POLICY_TABLE: &[(&str, &str)] = &[
    (
        "healthcare",
        "Universal healthcare policy guarantees every resident access to essential medical \
         services, funded through taxation and public insurance. Primary care visits, \
         emergency treatment and essential medicines are covered; some specialist services \
         may require a co-payment.",
    ),
    (
        "health insurance",
        "Public health insurance is mandatory for residents. Contributions are deducted from \
         salaries, while unemployed people and pensioners are covered by the state.",
    ),
    (
        "education",
        "Public education is free from primary school through secondary school. Schooling is \
         compulsory up to age 16, and tuition grants are available for higher education based \
         on household income.",
    ),
    (
        "student loan",
        "Student loans cover tuition and living costs. Repayments start once your income \
         passes the repayment threshold and are collected through the tax system.",
    ),
    (
        "tax",
        "Income tax is progressive: each portion of income above a bracket threshold is taxed \
         at a higher rate. Annual returns are filed online, and most deductions for dependants \
         and pension contributions are applied automatically.",
    ),
    (
        "housing",
        "Housing policy combines social housing for low-income households, rent increase caps \
         in high-demand areas and first-time buyer support schemes.",
    ),
    (
        "pension",
        "The state pension is paid from the statutory retirement age to anyone with enough \
         qualifying contribution years. Workplace pensions add to it through automatic \
         enrolment.",
    ),
    (
        "unemployment",
        "Unemployment benefit is available to people who lost their job involuntarily and have \
         contributed for at least 12 months. You must register with the employment office and \
         actively look for work.",
    ),
    (
        "employment",
        "Employment rights cover written contracts, paid annual leave and protection from unfair \
         dismissal. The employment office also offers free job matching and retraining courses.",
    ),
    (
        "minimum wage",
        "The national minimum wage is reviewed every year and applies to all workers above \
         school-leaving age, including part-time and temporary staff.",
    ),
    (
        "climate",
        "The climate action plan targets net-zero emissions by 2050 through renewable energy \
         investment, a carbon price on heavy emitters and home insulation grants.",
    ),
    (
        "immigration",
        "Immigration policy covers work visas, family reunification and asylum. Skilled-worker \
         visas require a job offer from a licensed sponsor.",
    ),
    (
        "vote",
        "Adult citizens can vote once registered. Registration can be completed online and \
         closes 12 working days before an election.",
    ),
    (
        "voting",
        "Voting is open to registered adult citizens, in person or by post. Polling stations \
         are open from 7am to 10pm on election day.",
    ),
    (
        "disability",
        "Disability support includes a monthly allowance, accessible transport passes and \
         workplace adjustment grants for employers.",
    ),
    (
        "childcare",
        "Working parents are entitled to subsidised childcare hours for children aged one to \
         school age, with extra support for low-income families.",
    ),
];

const LEGAL_DEFAULT: &str = "Thank you for your question. We could not match it to a specific \
legal area. Please describe your situation in more detail or contact a legal aid centre for \
personal advice.";

const LEGAL_TABLE: &[(&str, &str)] = &[
    (
        "tenant",
        "Tenants have the right to a written lease, proper notice before eviction and a home \
         in good repair. Keep copies of all correspondence with your landlord.",
    ),
    (
        "eviction",
        "A landlord must give written notice and obtain a court order before evicting a tenant. \
         Changing the locks without a court order is unlawful.",
    ),
    (
        "deposit",
        "Security deposits must be held in a protection scheme and returned within 30 days of \
         the tenancy ending, minus documented deductions for damage.",
    ),
    (
        "employment",
        "Employees are entitled to a written contract, the minimum wage, paid annual leave and \
         protection from unfair dismissal after the qualifying period.",
    ),
    (
        "dismiss",
        "If you believe you were dismissed unfairly, raise a written grievance with your \
         employer first. Tribunal claims must usually be filed within three months.",
    ),
    (
        "consumer",
        "Consumers can return faulty goods for a refund within 30 days and are entitled to a \
         repair or replacement after that. Online purchases have a 14-day cooling-off period.",
    ),
    (
        "refund",
        "Goods must be as described, of satisfactory quality and fit for purpose. If they are \
         not, you can claim a refund, repair or replacement from the seller.",
    ),
    (
        "divorce",
        "Divorce applications can be made online. Where children are involved, mediation is \
         normally required before the court decides on arrangements.",
    ),
    (
        "custody",
        "Child arrangement decisions are based on the best interests of the child. Parents are \
         encouraged to agree arrangements through mediation.",
    ),
    (
        "traffic",
        "Traffic fines can be challenged within 28 days of the notice. Provide photos, \
         receipts or witness statements supporting your appeal.",
    ),
    (
        "discrimination",
        "Discrimination based on age, disability, gender, race, religion or sexual orientation \
         is prohibited at work and in public services. Complaints can be filed with the \
         equality body.",
    ),
    (
        "data protection",
        "You can request a copy of the personal data an organisation holds about you. It must \
         respond within one month.",
    ),
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn healthcare_question_gets_healthcare_response() {
        let responder = KeywordResponder::policy_chatbot();

        let reply = responder.respond("What is universal healthcare?");

        assert_eq!(reply.keyword, Some("healthcare"));
        assert!(reply.text.contains("Universal healthcare policy"));
    }

    #[test]
    fn gibberish_gets_default_response() {
        let responder = KeywordResponder::policy_chatbot();

        let reply = responder.respond("asdkjaslkdj");

        assert_eq!(reply.keyword, None);
        assert_eq!(reply.text, responder.default_response());
    }

    #[test]
    fn matching_ignores_case() {
        let responder = KeywordResponder::policy_chatbot();
        assert_eq!(
            responder.respond("PENSION age?").keyword,
            Some("pension")
        );
    }

    #[test]
    fn longest_keyword_wins() {
        let responder = KeywordResponder::new(
            [("tax", "general tax"), ("tax return", "filing returns")],
            "none",
        );

        let reply = responder.respond("When is my tax return due?");

        assert_eq!(reply.text, "filing returns");
        assert_eq!(reply.keyword, Some("tax return"));
    }

    #[test]
    fn equal_length_ties_go_to_first_entry() {
        let responder = KeywordResponder::new([("rent", "first"), ("loan", "second")], "none");

        assert_eq!(responder.respond("loan for rent").text, "first");
    }

    #[test]
    fn empty_keywords_are_ignored() {
        let responder = KeywordResponder::new([("", "everything"), ("  ", "blank")], "none");

        assert!(responder.is_empty());
        assert_eq!(responder.respond("anything").text, "none");
        assert_eq!(responder.respond("").text, "none");
    }

    #[test]
    fn legal_advisor_matches_tenancy_questions() {
        let responder = KeywordResponder::legal_advisor();

        let reply = responder.respond("My landlord wants to keep my deposit");

        assert_eq!(reply.keyword, Some("deposit"));
    }

    #[test]
    fn every_suggested_policy_topic_has_an_answer() {
        let responder = KeywordResponder::policy_chatbot();
        let topics = [
            "healthcare",
            "education",
            "taxes",
            "housing",
            "pensions",
            "employment",
            "climate",
            "immigration",
            "voting",
        ];

        for topic in topics {
            assert!(
                POLICY_DEFAULT.contains(topic),
                "{topic} missing from the default reply"
            );
            let reply = responder.respond(&format!("Tell me about {topic}"));
            assert!(reply.keyword.is_some(), "no entry matches {topic}");
        }
        assert_eq!(
            responder.respond("How do I claim unemployment?").keyword,
            Some("unemployment")
        );
    }
}
