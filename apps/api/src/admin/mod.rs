//! Authenticated content management: saves, deletes, dashboard, backup and
//! cache maintenance.

pub mod handlers;

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::PgPool;

use crate::catalog::certifications::{load_certifications, CertificationBundle};
use crate::catalog::education::{load_educations, EducationBundle};
use crate::catalog::experience::{load_experiences, ExperienceBundle};
use crate::catalog::profile::{load_profile, ProfileBundle};
use crate::catalog::projects::{load_projects, ProjectBundle, ProjectFilter};
use crate::catalog::skills::{load_skills, SkillBundle};

pub const BACKUP_VERSION: &str = "1.0";

/// Every content table with its relations, untranslated items included.
#[derive(Debug, Serialize)]
pub struct ContentSnapshot {
    pub projects: Vec<ProjectBundle>,
    pub experiences: Vec<ExperienceBundle>,
    pub education: Vec<EducationBundle>,
    pub skills: Vec<SkillBundle>,
    pub certifications: Vec<CertificationBundle>,
    pub profile: Option<ProfileBundle>,
}

#[derive(Debug, Serialize, PartialEq, Eq)]
pub struct ContentCounts {
    pub projects: usize,
    pub experiences: usize,
    pub education: usize,
    pub skills: usize,
    pub certifications: usize,
    pub profile: bool,
}

impl ContentSnapshot {
    pub fn counts(&self) -> ContentCounts {
        ContentCounts {
            projects: self.projects.len(),
            experiences: self.experiences.len(),
            education: self.education.len(),
            skills: self.skills.len(),
            certifications: self.certifications.len(),
            profile: self.profile.is_some(),
        }
    }
}

pub async fn load_snapshot(pool: &PgPool) -> Result<ContentSnapshot, sqlx::Error> {
    Ok(ContentSnapshot {
        projects: load_projects(pool, &ProjectFilter::default()).await?,
        experiences: load_experiences(pool).await?,
        education: load_educations(pool).await?,
        skills: load_skills(pool, None, false).await?,
        certifications: load_certifications(pool).await?,
        profile: load_profile(pool).await?,
    })
}

#[derive(Debug, Serialize)]
pub struct Backup {
    pub timestamp: DateTime<Utc>,
    pub version: &'static str,
    #[serde(flatten)]
    pub content: ContentSnapshot,
}

pub fn backup_filename(at: DateTime<Utc>) -> String {
    format!("portfolio_backup_{}.json", at.format("%Y%m%d_%H%M%S"))
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    fn empty() -> ContentSnapshot {
        ContentSnapshot {
            projects: Vec::new(),
            experiences: Vec::new(),
            education: Vec::new(),
            skills: Vec::new(),
            certifications: Vec::new(),
            profile: None,
        }
    }

    #[test]
    fn test_backup_filename() {
        let at = Utc.with_ymd_and_hms(2024, 3, 9, 7, 5, 1).unwrap();
        assert_eq!(backup_filename(at), "portfolio_backup_20240309_070501.json");
    }

    #[test]
    fn test_backup_shape() {
        let at = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let backup = Backup {
            timestamp: at,
            version: BACKUP_VERSION,
            content: empty(),
        };
        let json = serde_json::to_value(&backup).unwrap();
        assert_eq!(json["version"], "1.0");
        assert_eq!(json["timestamp"], "2024-01-01T00:00:00Z");
        assert!(json["projects"].as_array().unwrap().is_empty());
        assert!(json["profile"].is_null());
    }

    #[test]
    fn test_counts() {
        assert_eq!(empty().counts().projects, 0);
        assert!(!empty().counts().profile);
    }
}
