use sqlx::PgPool;
use tracing::info;

use super::google::GoogleUser;
use crate::models::user::{Role, User};

/// `(name, surname)`, preferring Google's split fields over the display name.
pub fn split_name(user: &GoogleUser) -> (Option<String>, Option<String>) {
    if user.given_name.is_some() || user.family_name.is_some() {
        return (user.given_name.clone(), user.family_name.clone());
    }
    match user.name.as_deref().map(str::trim).filter(|n| !n.is_empty()) {
        Some(full) => match full.split_once(' ') {
            Some((first, rest)) => (Some(first.to_string()), Some(rest.trim().to_string())),
            None => (Some(full.to_string()), None),
        },
        None => (None, None),
    }
}

pub fn is_owner_email(email: &str, admin_email: Option<&str>) -> bool {
    admin_email.is_some_and(|admin| admin.eq_ignore_ascii_case(email.trim()))
}

/// Creates the user on first sign-in or refreshes their profile fields.
/// The owner's address is promoted to admin and the promotion is stored.
pub async fn upsert_google_user(
    pool: &PgPool,
    google: &GoogleUser,
    country: Option<&str>,
    admin_email: Option<&str>,
) -> Result<User, sqlx::Error> {
    let email = google.email.trim().to_lowercase();
    let (name, surname) = split_name(google);

    let user = sqlx::query_as::<_, User>(
        r#"
        INSERT INTO users (email, name, surname, country, picture_url, role, is_verified, last_login)
        VALUES ($1, $2, $3, $4, $5, 'visitor', TRUE, NOW())
        ON CONFLICT (email) DO UPDATE
        SET name = EXCLUDED.name,
            surname = EXCLUDED.surname,
            picture_url = EXCLUDED.picture_url,
            is_verified = TRUE,
            last_login = NOW()
        RETURNING *
        "#,
    )
    .bind(&email)
    .bind(name)
    .bind(surname)
    .bind(country)
    .bind(&google.picture)
    .fetch_one(pool)
    .await?;

    if is_owner_email(&email, admin_email) && user.role() != Role::Admin {
        info!("Promoting owner account {email} to admin");
        return sqlx::query_as::<_, User>("UPDATE users SET role = $2 WHERE id = $1 RETURNING *")
            .bind(user.id)
            .bind(Role::Admin.as_str())
            .fetch_one(pool)
            .await;
    }
    Ok(user)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn google(name: Option<&str>, given: Option<&str>, family: Option<&str>) -> GoogleUser {
        GoogleUser {
            email: "someone@example.com".to_string(),
            verified_email: true,
            name: name.map(String::from),
            given_name: given.map(String::from),
            family_name: family.map(String::from),
            picture: None,
        }
    }

    #[test]
    fn test_split_name_prefers_given_family() {
        let g = google(Some("Ignored Name"), Some("Ana"), Some("García López"));
        assert_eq!(split_name(&g), (Some("Ana".into()), Some("García López".into())));
    }

    #[test]
    fn test_split_name_from_display_name() {
        assert_eq!(
            split_name(&google(Some("Ana García López"), None, None)),
            (Some("Ana".into()), Some("García López".into()))
        );
        assert_eq!(split_name(&google(Some("Ana"), None, None)), (Some("Ana".into()), None));
        assert_eq!(split_name(&google(None, None, None)), (None, None));
    }

    #[test]
    fn test_is_owner_email_case_insensitive() {
        assert!(is_owner_email("Owner@Example.com", Some("owner@example.com")));
        assert!(!is_owner_email("guest@example.com", Some("owner@example.com")));
        assert!(!is_owner_email("owner@example.com", None));
    }
}
