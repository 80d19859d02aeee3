//! Survey column names as they appear in the source table header.
//!
//! Classifiers match on these literal strings, so a change in the survey
//! wording must be mirrored here.

use crate::types::{RawRecord, Reason};

pub const LAT: &str = "lat";
pub const LON: &str = "lon";

pub const INTERNET_ACCESS: &str = "Does the library currently have Internet access?";
pub const DOWNLOAD_SPEED: &str =
    "What is the average Internet/download speed available at the library?";
pub const CONNECTION_TYPE: &str = "What type of Internet connection does the library have?";
pub const PERCEIVED_QUALITY: &str =
    "How would you rate the quality of the Internet connection at the library (0-100)?";

pub const COUNTRY_KEYS: [&str; 11] = [
    "country", "Country", "COUNTRY", "admin", "ADMIN", "nation", "Nation", "país", "pais", "País",
    "Pais",
];

pub const NAME_KEYS: [&str; 5] = ["name", "Name", "Library name", "Library Name", "Name of library"];

pub const LIBRARY_TYPE: &str = "Select the library type";
pub const LIBRARY_TYPE_OTHER: &str = "Other (specify):Select the library type";
pub const STAFF: &str = "How many staff members work at your library (full-time equivalent)?";
pub const AVAILABILITY: &str = "How many hours per day is the Internet available to users?";
pub const DEVICES_AVAILABLE: &str =
    "How many computers or devices with Internet access are available for users in your library?";
pub const DEVICES_AVAILABLE_MORE: &str = "More than 20 (specify):How many computers or devices with Internet access are available for users in your library?";
pub const DAILY_USERS: &str = "Please provide an approximate number for the amount of users that access the library Internet on a daily basis.";
pub const DIGITAL_AVAILABLE: &str = "Provide an approximate estimate of the number digital resources that are available in your collection";
pub const REMOTE_ACCESS: &str =
    "Are your digital resources accessible remotely? (outside of library premises)";

/// A multi-select question whose options are spread over
/// `"<label>:<question>"` columns.
#[derive(Debug, Clone, Copy)]
pub struct MultiSelect<K: 'static> {
    pub question: &'static str,
    pub options: &'static [(K, &'static str)],
}

impl<K: Copy> MultiSelect<K> {
    /// Column key holding the answer for one option label.
    pub fn column(&self, label: &str) -> String {
        format!("{}:{}", label, self.question)
    }

    /// Value of an option: the exact compound key first, then the bare label,
    /// then the lexically first column whose text before the first `:` is the
    /// label and whose question is not another declared multi-select.
    pub fn value(&self, record: &RawRecord, label: &str) -> String {
        let exact = self.column(label);
        if record.get(&exact).is_some() {
            return record.text(&exact);
        }
        if record.get(label).is_some() {
            return record.text(label);
        }
        record
            .iter()
            .filter(|(key, _)| {
                key.split_once(':').is_some_and(|(prefix, question)| {
                    prefix.trim() == label && !self.is_foreign_question(question)
                })
            })
            .min_by(|a, b| a.0.cmp(b.0))
            .map(|(_, value)| value.to_string().trim().to_string())
            .unwrap_or_default()
    }

    fn is_foreign_question(&self, question: &str) -> bool {
        let question = question.trim();
        DECLARED_QUESTIONS
            .iter()
            .any(|declared| *declared != self.question && *declared == question)
    }

    /// Options that carry any non-blank answer.
    pub fn selected<'a>(&'a self, record: &'a RawRecord) -> impl Iterator<Item = (K, &'static str, String)> + 'a {
        self.options.iter().filter_map(move |(key, label)| {
            let value = record.text(&self.column(label));
            if value.is_empty() {
                None
            } else {
                Some((*key, *label, value))
            }
        })
    }
}

const DECLARED_QUESTIONS: [&str; 4] = [
    NOT_CONNECTED_REASONS.question,
    TARGET_AUDIENCE.question,
    DEVICES_USED.question,
    DIGITAL_RESOURCES.question,
];

/// Label of the catch-all reason column.
pub const ALL_OF_THE_ABOVE: &str = "All of the above";

pub const NOT_CONNECTED_REASONS: MultiSelect<Reason> = MultiSelect {
    question: "What are the main reasons the library is not connected to the Internet?",
    options: &[
        (Reason::Infrastructure, "Infrastructure limitations"),
        (Reason::HighCost, "High cost"),
        (Reason::Electrical, "Electrical supply issues"),
        (Reason::DigitalLiteracy, "Digital literacy gaps"),
        (Reason::Policy, "Policy/Regulatory barriers"),
    ],
};

pub const TARGET_AUDIENCE: MultiSelect<()> = MultiSelect {
    question: "Select multiple options to specify the approximate target audience of your library",
    options: &[
        ((), "Children (0-12 years)"),
        ((), "Teenagers (13-17 years)"),
        ((), "Adults (18-60 years)"),
        ((), "Seniors (65+ years)"),
        ((), "Students"),
        ((), "Entrepreneurs"),
        ((), "Educators / Teachers"),
        ((), "Researchers / Academics"),
    ],
};

pub const DEVICES_USED: MultiSelect<()> = MultiSelect {
    question: "What devices are primarily used to access the Internet?",
    options: &[
        ((), "Desktop computers"),
        ((), "Laptops"),
        ((), "Smartphones"),
        ((), "Tablets"),
        ((), "Other"),
    ],
};

pub const DIGITAL_RESOURCES: MultiSelect<()> = MultiSelect {
    question: "What types of digital resources are used at the library?",
    options: &[
        ((), "Educational websites"),
        ((), "Online journals"),
        ((), "Online courses"),
        ((), "E-books"),
        ((), "Educational videos"),
        ((), "Interactive software"),
        ((), "Other (specify)"),
    ],
};
