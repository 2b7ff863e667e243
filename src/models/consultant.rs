use serde::Deserialize;

use super::{NOT_UPDATED, RawId, id_of, lenient, non_empty, split_list, text_or};

pub const DEFAULT_SPECIALTY: &str = "Psychological counseling";
pub const DEFAULT_RATING: f64 = 5.0;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawAccount {
    #[serde(default, deserialize_with = "lenient")]
    pub id: Option<RawId>,
    #[serde(default, deserialize_with = "lenient")]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub email: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub phone: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub avatar: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub address: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub gender: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub date_of_birth: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub status: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub role: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawConsultant {
    #[serde(default, deserialize_with = "lenient")]
    pub id: Option<RawId>,
    #[serde(default, deserialize_with = "lenient")]
    pub account_id: Option<RawId>,
    #[serde(default, deserialize_with = "lenient")]
    pub consultant_name: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub bio: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub consultations: Option<i64>,
    #[serde(default, deserialize_with = "lenient")]
    pub degree_level: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub experience: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub expiry_date: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub field_of_study: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub issued_date: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub organization: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub rating: Option<f64>,
    #[serde(default, deserialize_with = "lenient")]
    pub specialities: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub account: Option<RawAccount>,
}

impl RawConsultant {
    /// Stand-in account used when `account/{id}` cannot be fetched.
    pub fn fallback_account(&self) -> RawAccount {
        RawAccount {
            id: self.account_id.clone(),
            name: Some(text_or(self.consultant_name.clone(), NOT_UPDATED)),
            avatar: Some(self.initial()),
            status: Some("ACTIVE".to_string()),
            ..Default::default()
        }
    }

    fn initial(&self) -> String {
        self.consultant_name
            .as_deref()
            .and_then(|name| name.trim().chars().next())
            .map(|c| c.to_string())
            .unwrap_or_else(|| "C".to_string())
    }
}

/// A consultant profile merged with its account record.
#[derive(Debug, Clone, PartialEq)]
pub struct Consultant {
    pub account_id: Option<i64>,
    pub consultant_id: Option<i64>,
    pub name: String,
    pub email: String,
    pub phone: String,
    pub avatar: String,
    pub address: String,
    pub gender: String,
    pub date_of_birth: Option<String>,
    pub status: String,
    pub bio: String,
    pub consultations: i64,
    pub degree_level: String,
    pub experience: String,
    pub expiry_date: Option<String>,
    pub field_of_study: String,
    pub issued_date: Option<String>,
    pub organization: String,
    pub rating: f64,
    pub specialties: Vec<String>,
    pub consultant_name: String,
}

impl Consultant {
    pub fn merge(consultant: &RawConsultant, account: Option<&RawAccount>) -> Consultant {
        let fallback;
        let account = match account {
            Some(account) => account,
            None => {
                fallback = consultant.fallback_account();
                &fallback
            }
        };
        let consultant_name = text_or(consultant.consultant_name.clone(), NOT_UPDATED);
        let name = non_empty(account.name.clone()).unwrap_or_else(|| consultant_name.clone());
        let mut specialties = split_list(consultant.specialities.as_deref());
        if specialties.is_empty() {
            specialties.push(DEFAULT_SPECIALTY.to_string());
        }
        Consultant {
            account_id: id_of(&account.id).or_else(|| id_of(&consultant.account_id)),
            consultant_id: id_of(&consultant.id),
            name,
            email: account.email.clone().unwrap_or_default(),
            phone: account.phone.clone().unwrap_or_default(),
            avatar: non_empty(account.avatar.clone()).unwrap_or_else(|| consultant.initial()),
            address: account.address.clone().unwrap_or_default(),
            gender: account.gender.clone().unwrap_or_default(),
            date_of_birth: non_empty(account.date_of_birth.clone()),
            status: text_or(account.status.clone(), "ACTIVE"),
            bio: text_or(consultant.bio.clone(), "No information yet"),
            consultations: consultant.consultations.unwrap_or(0),
            degree_level: text_or(consultant.degree_level.clone(), NOT_UPDATED),
            experience: text_or(consultant.experience.clone(), NOT_UPDATED),
            expiry_date: non_empty(consultant.expiry_date.clone()),
            field_of_study: text_or(consultant.field_of_study.clone(), NOT_UPDATED),
            issued_date: non_empty(consultant.issued_date.clone()),
            organization: text_or(consultant.organization.clone(), NOT_UPDATED),
            rating: consultant
                .rating
                .filter(|r| *r > 0.0)
                .unwrap_or(DEFAULT_RATING),
            specialties,
            consultant_name,
        }
    }

    pub fn is_consultant_account(account: &RawAccount) -> bool {
        account.role.as_deref() == Some("CONSULTANT")
    }
}

/// Listing filters. `search` is a case-insensitive substring over name,
/// field of study and specialties; `specialty` must equal the field of study
/// or one specialty, ignoring case. A specialty of "all" matches everyone.
#[derive(Debug, Clone, Default)]
pub struct ConsultantFilter {
    pub search: Option<String>,
    pub specialty: Option<String>,
}

impl ConsultantFilter {
    pub fn matches(&self, consultant: &Consultant) -> bool {
        let search = self
            .search
            .as_deref()
            .map(|q| q.trim().to_lowercase())
            .filter(|q| !q.is_empty());
        if let Some(query) = search {
            let hit = consultant.name.to_lowercase().contains(&query)
                || consultant.field_of_study.to_lowercase().contains(&query)
                || consultant
                    .specialties
                    .iter()
                    .any(|s| s.to_lowercase().contains(&query));
            if !hit {
                return false;
            }
        }

        let specialty = self
            .specialty
            .as_deref()
            .map(|s| s.trim().to_lowercase())
            .filter(|s| !s.is_empty() && s != "all");
        match specialty {
            Some(wanted) => {
                consultant.field_of_study.to_lowercase() == wanted
                    || consultant.specialties.iter().any(|s| s.to_lowercase() == wanted)
            }
            None => true,
        }
    }
}

pub fn filter_consultants(consultants: Vec<Consultant>, filter: &ConsultantFilter) -> Vec<Consultant> {
    consultants.into_iter().filter(|c| filter.matches(c)).collect()
}
