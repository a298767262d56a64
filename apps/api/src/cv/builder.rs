use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::PgPool;
use tracing::{debug, info, warn};

use crate::cache::{cv_key, CV_TTL};
use crate::catalog::certifications::{load_certifications, CertificationBundle};
use crate::catalog::education::{load_educations, EducationBundle};
use crate::catalog::experience::{load_experiences, ExperienceBundle};
use crate::catalog::lang::pick_translation;
use crate::catalog::profile::{load_profile, ProfileBundle};
use crate::catalog::projects::{load_projects, ProjectBundle, ProjectFilter};
use crate::catalog::skills::{load_skills, SkillBundle};
use crate::errors::AppError;
use crate::state::AppState;

/// Cache namespace of the site owner's résumé.
pub const DEFAULT_PROFILE: &str = "default";

/// Skill categories in the order recruiters expect them.
const CATEGORY_ORDER: &[&str] = &[
    "languages",
    "data-engineering",
    "databases",
    "cloud",
    "devops",
    "visualization",
    "other",
];

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Resume {
    pub basics: Basics,
    pub work: Vec<Work>,
    pub skills: Vec<SkillGroup>,
    pub education: Vec<EducationEntry>,
    pub awards: Vec<Award>,
    pub projects: Vec<ResumeProject>,
    pub languages: Vec<SpokenLanguage>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Basics {
    pub name: String,
    pub label: String,
    pub email: String,
    pub phone: String,
    pub image: String,
    pub summary: String,
    pub location: ResumeLocation,
    pub profiles: Vec<SocialProfile>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ResumeLocation {
    pub city: String,
    pub region: String,
    pub country_code: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SocialProfile {
    pub network: String,
    pub username: String,
    pub url: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Work {
    pub company: String,
    pub position: String,
    pub location: String,
    pub start_date: String,
    pub end_date: String,
    pub summary: String,
    pub highlights: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SkillGroup {
    pub name: String,
    pub keywords: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct EducationEntry {
    pub institution: String,
    pub area: String,
    pub study_type: String,
    pub start_date: String,
    pub end_date: String,
    pub location: String,
    pub courses: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Award {
    pub title: String,
    pub date: String,
    pub awarder: String,
    pub summary: String,
    pub link: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResumeProject {
    pub name: String,
    pub description: String,
    pub url: String,
    pub keywords: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpokenLanguage {
    pub language: String,
    pub fluency: String,
}

impl Resume {
    /// Enough to print: a name, a summary and at least one skill group.
    pub fn has_content(&self) -> bool {
        !self.basics.name.trim().is_empty()
            && !self.basics.summary.trim().is_empty()
            && !self.skills.is_empty()
    }

    pub fn is_empty(&self) -> bool {
        *self == Resume::default()
    }
}

/// Rows feeding one résumé.
#[derive(Debug, Default)]
pub struct CvSources {
    pub profile: Option<ProfileBundle>,
    pub experiences: Vec<ExperienceBundle>,
    pub educations: Vec<EducationBundle>,
    /// Only skills flagged `show_in_cv`.
    pub skills: Vec<SkillBundle>,
    pub certifications: Vec<CertificationBundle>,
    /// Only projects flagged `is_featured_cv`.
    pub projects: Vec<ProjectBundle>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkillLevel {
    Advanced,
    Intermediate,
    Beginner,
}

impl SkillLevel {
    pub fn from_proficiency(proficiency: i32) -> SkillLevel {
        match proficiency {
            p if p >= 80 => SkillLevel::Advanced,
            p if p >= 50 => SkillLevel::Intermediate,
            _ => SkillLevel::Beginner,
        }
    }

    pub fn label(self, lang: &str) -> &'static str {
        let es = lang == "es";
        match self {
            SkillLevel::Advanced if es => "Avanzado",
            SkillLevel::Advanced => "Advanced",
            SkillLevel::Intermediate if es => "Intermedio",
            SkillLevel::Intermediate => "Intermediate",
            SkillLevel::Beginner if es => "Básico",
            SkillLevel::Beginner => "Beginner",
        }
    }
}

pub fn category_label(category: &str, lang: &str) -> String {
    let es = lang == "es";
    let label = match category {
        "languages" if es => "Lenguajes de Programación",
        "languages" => "Programming Languages",
        "data-engineering" if es => "Ingeniería de Datos",
        "data-engineering" => "Data Engineering",
        "databases" if es => "Bases de Datos",
        "databases" => "Databases & Warehouses",
        "cloud" if es => "Plataformas Cloud",
        "cloud" => "Cloud Platforms",
        "devops" if es => "DevOps & Herramientas",
        "devops" => "DevOps & Tools",
        "visualization" if es => "Visualización de Datos",
        "visualization" => "Data Visualization",
        "other" if es => "Otras Habilidades",
        "other" => "Other Skills",
        other => other,
    };
    label.to_string()
}

pub fn present_label(lang: &str) -> &'static str {
    if lang == "es" {
        "Actualidad"
    } else {
        "Present"
    }
}

/// Splits a description into prose and bullet highlights (lines starting
/// with `-`, `*` or `•`).
pub fn split_description(description: &str) -> (String, Vec<String>) {
    let mut summary = Vec::new();
    let mut highlights = Vec::new();
    for line in description.lines().map(str::trim).filter(|l| !l.is_empty()) {
        match line.strip_prefix(['-', '*', '•']) {
            Some(bullet) => {
                let bullet = bullet.trim();
                if !bullet.is_empty() {
                    highlights.push(bullet.to_string());
                }
            }
            None => summary.push(line),
        }
    }
    (summary.join(" "), highlights)
}

/// ISO-style country code guess: the first two letters, uppercased.
pub fn country_code(country: &str) -> String {
    country.trim().chars().take(2).collect::<String>().to_uppercase()
}

fn json_str(value: &Value, key: &str) -> String {
    value
        .get(key)
        .and_then(Value::as_str)
        .unwrap_or_default()
        .trim()
        .to_string()
}

fn location_from(value: Option<&Value>) -> ResumeLocation {
    match value {
        Some(value @ Value::Object(_)) => ResumeLocation {
            city: json_str(value, "city"),
            region: json_str(value, "region"),
            country_code: country_code(&json_str(value, "country")),
        },
        Some(Value::String(city)) => ResumeLocation {
            city: city.trim().to_string(),
            ..ResumeLocation::default()
        },
        _ => ResumeLocation::default(),
    }
}

/// LinkedIn, GitHub and website first, any other network after, by name.
pub fn social_profiles(social: Option<&Value>) -> Vec<SocialProfile> {
    let Some(Value::Object(map)) = social else {
        return Vec::new();
    };
    let known = [("linkedin", "LinkedIn"), ("github", "GitHub"), ("website", "Website")];
    let url_of = |key: &str| {
        map.get(key)
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|u| !u.is_empty())
            .map(String::from)
    };

    let mut profiles: Vec<SocialProfile> = known
        .iter()
        .filter_map(|(key, network)| {
            url_of(key).map(|url| SocialProfile {
                network: network.to_string(),
                username: String::new(),
                url,
            })
        })
        .collect();

    let others: BTreeMap<&String, String> = map
        .keys()
        .filter(|k| !known.iter().any(|(known_key, _)| known_key == k))
        .filter_map(|k| url_of(k).map(|url| (k, url)))
        .collect();
    profiles.extend(others.into_iter().map(|(key, url)| SocialProfile {
        network: capitalize(key),
        username: String::new(),
        url,
    }));
    profiles
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

fn basics(profile: &ProfileBundle, lang: &str) -> Basics {
    let p = &profile.profile;
    let t = profile.translation(lang);
    Basics {
        name: p.name.clone(),
        label: t.and_then(|t| t.role.clone()).unwrap_or_default(),
        email: p.email.clone().unwrap_or_default(),
        phone: p.phone.clone().unwrap_or_default(),
        image: p.avatar_url.clone().unwrap_or_default(),
        summary: t.and_then(|t| t.bio.clone()).unwrap_or_default(),
        location: location_from(p.location.as_ref()),
        profiles: social_profiles(p.social_links.as_ref()),
    }
}

fn spoken_languages(profile: &ProfileBundle, lang: &str) -> Vec<SpokenLanguage> {
    profile
        .translation(lang)
        .and_then(|t| t.languages.clone())
        .and_then(|v| serde_json::from_value(v).ok())
        .unwrap_or_default()
}

fn work(experience: &ExperienceBundle, lang: &str) -> Option<Work> {
    let t = pick_translation(&experience.translations, lang)?;
    let e = &experience.experience;
    let (summary, highlights) = split_description(t.description.as_deref().unwrap_or_default());
    let end_date = match (&e.end_date, e.current) {
        (_, true) | (None, false) => present_label(lang).to_string(),
        (Some(end), false) => end.clone(),
    };
    Some(Work {
        company: e.company.clone().unwrap_or_default(),
        position: t.title.clone().unwrap_or_default(),
        location: e.location.clone().unwrap_or_default(),
        start_date: e.start_date.clone().unwrap_or_default(),
        end_date,
        summary,
        highlights,
    })
}

/// Groups skills by category: known categories in [`CATEGORY_ORDER`], then
/// unknown ones alphabetically. Keywords read `"Name (Level)"`.
pub fn group_skills(skills: &[SkillBundle], lang: &str) -> Vec<SkillGroup> {
    let mut by_category: BTreeMap<String, Vec<String>> = BTreeMap::new();
    for skill in skills {
        let Some(t) = pick_translation(&skill.translations, lang) else {
            continue;
        };
        let category = skill
            .skill
            .category
            .as_deref()
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .unwrap_or("other");
        let level = SkillLevel::from_proficiency(skill.skill.proficiency).label(lang);
        by_category
            .entry(category.to_string())
            .or_default()
            .push(format!("{} ({level})", t.name));
    }

    let mut groups = Vec::new();
    for category in CATEGORY_ORDER {
        if let Some(keywords) = by_category.remove(*category) {
            groups.push(SkillGroup {
                name: category_label(category, lang),
                keywords,
            });
        }
    }
    groups.extend(by_category.into_iter().map(|(category, keywords)| SkillGroup {
        name: category_label(&category, lang),
        keywords,
    }));
    groups
}

fn education(bundle: &EducationBundle, lang: &str) -> Option<EducationEntry> {
    let t = pick_translation(&bundle.translations, lang)?;
    let e = &bundle.education;
    let end_date = match (&e.end_date, e.current) {
        (Some(end), false) => end.clone(),
        _ => present_label(lang).to_string(),
    };
    Some(EducationEntry {
        institution: e.institution.clone().unwrap_or_default(),
        area: t.subtitle.clone().unwrap_or_default(),
        study_type: t.title.clone().unwrap_or_default(),
        start_date: e.start_date.clone().unwrap_or_default(),
        end_date,
        location: e.location.clone().unwrap_or_default(),
        courses: bundle.course_names(),
    })
}

fn award(bundle: &CertificationBundle, lang: &str) -> Option<Award> {
    let t = pick_translation(&bundle.translations, lang)?;
    let c = &bundle.certification;
    Some(Award {
        title: t.title.clone().unwrap_or_default(),
        date: c.issue_date.clone().unwrap_or_default(),
        awarder: c.issuer.clone().unwrap_or_default(),
        summary: t.description.clone().unwrap_or_default(),
        link: c.credential_url.clone().unwrap_or_default(),
    })
}

fn project(bundle: &ProjectBundle, lang: &str) -> Option<ResumeProject> {
    let t = pick_translation(&bundle.translations, lang)?;
    let url = bundle
        .project
        .url
        .clone()
        .or_else(|| bundle.urls.first().map(|u| u.url.clone()))
        .unwrap_or_default();
    Some(ResumeProject {
        name: t.title.clone().unwrap_or_default(),
        description: t
            .summary
            .clone()
            .or_else(|| t.description.clone())
            .unwrap_or_default(),
        url,
        keywords: bundle.tags.iter().map(|tag| tag.name.clone()).collect(),
    })
}

/// Assembles the résumé for `lang` from stored content.
pub fn build_resume(sources: &CvSources, lang: &str) -> Resume {
    Resume {
        basics: sources
            .profile
            .as_ref()
            .map(|p| basics(p, lang))
            .unwrap_or_default(),
        work: sources.experiences.iter().filter_map(|e| work(e, lang)).collect(),
        skills: group_skills(&sources.skills, lang),
        education: sources.educations.iter().filter_map(|e| education(e, lang)).collect(),
        awards: sources.certifications.iter().filter_map(|c| award(c, lang)).collect(),
        projects: sources.projects.iter().filter_map(|p| project(p, lang)).collect(),
        languages: sources
            .profile
            .as_ref()
            .map(|p| spoken_languages(p, lang))
            .unwrap_or_default(),
    }
}

async fn load_sources(pool: &PgPool) -> Result<CvSources, sqlx::Error> {
    let featured = ProjectFilter {
        featured_cv_only: true,
        ..ProjectFilter::default()
    };
    Ok(CvSources {
        profile: load_profile(pool).await?,
        experiences: load_experiences(pool).await?,
        educations: load_educations(pool).await?,
        skills: load_skills(pool, None, true).await?,
        certifications: load_certifications(pool).await?,
        projects: load_projects(pool, &featured).await?,
    })
}

/// Résumé stored in the fallback file, keyed by language:
/// `{"es": {...}, "en": {...}}`. Falls back to the default language.
pub async fn load_fallback(path: &Path, lang: &str, default_lang: &str) -> Option<Resume> {
    let raw = match tokio::fs::read_to_string(path).await {
        Ok(raw) => raw,
        Err(e) => {
            debug!("CV fallback file {} unavailable: {e}", path.display());
            return None;
        }
    };
    let mut document: Value = match serde_json::from_str(&raw) {
        Ok(doc) => doc,
        Err(e) => {
            warn!("CV fallback file {} is not valid JSON: {e}", path.display());
            return None;
        }
    };
    let key = if document.get(lang).is_some() { lang } else { default_lang };
    let entry = document.get_mut(key).map(Value::take)?;
    match serde_json::from_value::<Resume>(entry) {
        Ok(resume) if !resume.is_empty() => Some(resume),
        Ok(_) => None,
        Err(e) => {
            warn!("CV fallback entry for {lang} does not match the résumé shape: {e}");
            None
        }
    }
}

/// The résumé for `lang`: cached copy, else built from the database, else
/// the fallback file. Whatever is found is cached for an hour.
pub async fn get_cv_data(state: &AppState, lang: &str) -> Result<Option<Resume>, AppError> {
    let key = cv_key(DEFAULT_PROFILE, lang);
    if let Some(hit) = state.cache.get_json::<Resume>(&key).await {
        return Ok(Some(hit));
    }

    let built = match load_sources(&state.db).await {
        Ok(sources) => Some(build_resume(&sources, lang)).filter(Resume::has_content),
        Err(e) => {
            warn!("Could not build CV from database, trying fallback file: {e}");
            None
        }
    };
    let resume = match built {
        Some(resume) => Some(resume),
        None => {
            load_fallback(&state.config.cv_fallback_path, lang, &state.config.default_lang).await
        }
    };

    if let Some(resume) = &resume {
        info!("Assembled CV for {lang}");
        state.cache.set_json(&key, resume, CV_TTL).await;
    }
    Ok(resume)
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use chrono::Utc;
    use serde_json::json;

    use super::*;
    use crate::models::career::{ExperienceRow, ExperienceTranslationRow};
    use crate::models::profile::{ProfileRow, ProfileTranslationRow};
    use crate::models::skill::{SkillRow, SkillTranslationRow};

    fn skill(id: i32, name: &str, category: Option<&str>, proficiency: i32) -> SkillBundle {
        let now = Utc::now();
        SkillBundle {
            skill: SkillRow {
                id,
                slug: name.to_lowercase(),
                icon_url: None,
                proficiency,
                category: category.map(String::from),
                sort_order: id,
                show_in_cv: true,
                created_at: now,
                updated_at: now,
            },
            translations: vec![SkillTranslationRow {
                id,
                skill_id: id,
                lang: "en".to_string(),
                name: name.to_string(),
                description: None,
            }],
        }
    }

    fn profile() -> ProfileBundle {
        let now = Utc::now();
        ProfileBundle {
            profile: ProfileRow {
                id: 1,
                slug: "ada".to_string(),
                name: "Ada Lovelace".to_string(),
                email: Some("ada@example.com".to_string()),
                phone: None,
                location: Some(json!({"city": "London", "region": "England", "country": "gb"})),
                avatar_url: None,
                social_links: Some(json!({
                    "mastodon": "https://m.social/@ada",
                    "github": "https://github.com/ada",
                    "linkedin": "https://linkedin.com/in/ada",
                    "blog": ""
                })),
                created_at: now,
                updated_at: now,
            },
            translations: vec![ProfileTranslationRow {
                id: 1,
                profile_id: 1,
                lang: "en".to_string(),
                role: Some("Data Engineer".to_string()),
                tagline: None,
                bio: Some("Builds pipelines.".to_string()),
                languages: Some(json!([{"language": "English", "fluency": "Native"}])),
            }],
        }
    }

    #[test]
    fn test_skill_levels() {
        assert_eq!(SkillLevel::from_proficiency(80), SkillLevel::Advanced);
        assert_eq!(SkillLevel::from_proficiency(79), SkillLevel::Intermediate);
        assert_eq!(SkillLevel::from_proficiency(50), SkillLevel::Intermediate);
        assert_eq!(SkillLevel::from_proficiency(49), SkillLevel::Beginner);
        assert_eq!(SkillLevel::Beginner.label("es"), "Básico");
        assert_eq!(SkillLevel::Advanced.label("en"), "Advanced");
    }

    #[test]
    fn test_group_skills_orders_categories() {
        let skills = vec![
            skill(1, "Grafana", Some("visualization"), 60),
            skill(2, "Rust", Some("languages"), 90),
            skill(3, "Terraform", Some("iac"), 40),
            skill(4, "Excel", None, 85),
            skill(5, "Ansible", Some("automation"), 55),
        ];
        let groups = group_skills(&skills, "en");
        let names: Vec<&str> = groups.iter().map(|g| g.name.as_str()).collect();
        assert_eq!(
            names,
            vec!["Programming Languages", "Data Visualization", "Other Skills", "automation", "iac"]
        );
        assert_eq!(groups[0].keywords, vec!["Rust (Advanced)"]);
        assert_eq!(groups[2].keywords, vec!["Excel (Advanced)"]);
    }

    #[test]
    fn test_split_description_bullets() {
        let (summary, highlights) =
            split_description("Led the data team.\n- Cut costs 30%\n* Migrated to Spark\n• \nShipped weekly.");
        assert_eq!(summary, "Led the data team. Shipped weekly.");
        assert_eq!(highlights, vec!["Cut costs 30%", "Migrated to Spark"]);
    }

    #[test]
    fn test_social_profiles_order() {
        let profiles = social_profiles(profile().profile.social_links.as_ref());
        let networks: Vec<&str> = profiles.iter().map(|p| p.network.as_str()).collect();
        assert_eq!(networks, vec!["LinkedIn", "GitHub", "Mastodon"]);
    }

    #[test]
    fn test_country_code() {
        assert_eq!(country_code("venezuela"), "VE");
        assert_eq!(country_code(""), "");
    }

    #[test]
    fn test_build_resume_from_sources() {
        let now = Utc::now();
        let sources = CvSources {
            profile: Some(profile()),
            experiences: vec![ExperienceBundle {
                experience: ExperienceRow {
                    id: 1,
                    slug: "acme".to_string(),
                    company: Some("Acme".to_string()),
                    location: None,
                    start_date: Some("2021-01".to_string()),
                    end_date: Some("2023-06".to_string()),
                    current: true,
                    created_at: now,
                    updated_at: now,
                },
                translations: vec![ExperienceTranslationRow {
                    id: 1,
                    experience_id: 1,
                    lang: "en".to_string(),
                    title: Some("Engineer".to_string()),
                    subtitle: None,
                    description: Some("Built things.\n- Shipped X".to_string()),
                }],
                tags: Vec::new(),
            }],
            skills: vec![skill(1, "Rust", Some("languages"), 90)],
            ..CvSources::default()
        };

        let resume = build_resume(&sources, "en");
        assert!(resume.has_content());
        assert_eq!(resume.basics.label, "Data Engineer");
        assert_eq!(resume.basics.location.country_code, "GB");
        assert_eq!(resume.work[0].end_date, "Present");
        assert_eq!(resume.work[0].highlights, vec!["Shipped X"]);
        assert_eq!(resume.languages[0].fluency, "Native");
    }

    #[test]
    fn test_resume_without_skills_has_no_content() {
        let sources = CvSources {
            profile: Some(profile()),
            ..CvSources::default()
        };
        assert!(!build_resume(&sources, "en").has_content());
    }

    #[test]
    fn test_resume_serializes_json_resume_keys() {
        let mut resume = Resume::default();
        resume.basics.location.country_code = "ES".to_string();
        resume.work.push(Work {
            start_date: "2020".to_string(),
            ..Work::default()
        });
        let json = serde_json::to_value(&resume).unwrap();
        assert_eq!(json["basics"]["location"]["countryCode"], "ES");
        assert_eq!(json["work"][0]["startDate"], "2020");
    }

    #[tokio::test]
    async fn test_load_fallback_picks_language_then_default() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            "{}",
            json!({"es": {"basics": {"name": "Ada", "summary": "Hola"}}})
        )
        .unwrap();

        let es = load_fallback(file.path(), "es", "es").await.unwrap();
        assert_eq!(es.basics.summary, "Hola");
        let en = load_fallback(file.path(), "en", "es").await.unwrap();
        assert_eq!(en.basics.name, "Ada");
        assert!(load_fallback(file.path(), "en", "fr").await.is_none());
    }

    #[tokio::test]
    async fn test_load_fallback_missing_file() {
        assert!(load_fallback(Path::new("does/not/exist.json"), "es", "es").await.is_none());
    }
}
