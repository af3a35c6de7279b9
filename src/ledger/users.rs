//! Membership and the referral graph.

use rand::Rng;
use std::collections::{HashMap, HashSet, VecDeque};
use tracing::{info, warn};

use super::new_id;
use crate::domain::{Cart, LedgerSettings, Registration, Role, User};
use crate::error::{LedgerError, LedgerResult};
use crate::store::UnitOfWork;

const CODE_ATTEMPTS: u32 = 64;

pub async fn load_user(uow: &UnitOfWork<'_>, id: &str) -> LedgerResult<User> {
    uow.load::<User>(id)
        .await?
        .ok_or_else(|| LedgerError::not_found("user", id))
}

/// Loads the acting user and checks they hold the admin role.
pub async fn require_admin(uow: &UnitOfWork<'_>, actor_id: &str) -> LedgerResult<User> {
    match uow.load::<User>(actor_id).await? {
        Some(user) if user.is_admin() => Ok(user),
        _ => {
            warn!(actor_id, "Admin operation refused");
            Err(LedgerError::Forbidden(actor_id.to_string()))
        }
    }
}

pub async fn find_by_referral_code(uow: &UnitOfWork<'_>, code: &str) -> LedgerResult<Option<User>> {
    let code = code.trim();
    Ok(uow
        .scan::<User>()
        .await?
        .into_iter()
        .find(|u| u.referral_code.eq_ignore_ascii_case(code)))
}

pub async fn find_by_email(uow: &UnitOfWork<'_>, email: &str) -> LedgerResult<Option<User>> {
    let email = email.trim();
    Ok(uow
        .scan::<User>()
        .await?
        .into_iter()
        .find(|u| u.email.eq_ignore_ascii_case(email)))
}

fn code_prefix(name: &str) -> String {
    let prefix: String = name
        .chars()
        .filter(|c| c.is_ascii_alphabetic())
        .take(3)
        .collect::<String>()
        .to_ascii_uppercase();
    if prefix.is_empty() {
        "USR".to_string()
    } else {
        prefix
    }
}

fn candidate_code(prefix: &str, attempt: u32) -> String {
    let bound = if attempt < CODE_ATTEMPTS / 2 { 1_000 } else { 1_000_000 };
    format!("{}{}", prefix, rand::thread_rng().gen_range(0..bound))
}

/// First three letters of the name plus a number, redrawn until unused.
pub async fn mint_referral_code(uow: &UnitOfWork<'_>, name: &str) -> LedgerResult<String> {
    let taken: HashSet<String> = uow
        .scan::<User>()
        .await?
        .into_iter()
        .map(|u| u.referral_code.to_ascii_uppercase())
        .collect();
    let prefix = code_prefix(name);
    (0..CODE_ATTEMPTS)
        .map(|attempt| candidate_code(&prefix, attempt))
        .find(|code| !taken.contains(code))
        .ok_or_else(|| LedgerError::InvariantViolation(format!("no free referral code for prefix {}", prefix)))
}

async fn create(uow: &mut UnitOfWork<'_>, registration: Registration, role: Role) -> LedgerResult<User> {
    let name = registration.name.trim().to_string();
    let email = registration.email.trim().to_string();
    if name.is_empty() || email.is_empty() {
        return Err(LedgerError::Validation("name and email are required".to_string()));
    }
    if find_by_email(uow, &email).await?.is_some() {
        return Err(LedgerError::AlreadyExists(format!("email {}", email)));
    }
    let referrer_id = match registration.referral_code.as_deref() {
        Some(code) if !code.trim().is_empty() => {
            let referrer = find_by_referral_code(uow, code).await?;
            if referrer.is_none() {
                warn!(code, "Unknown referral code, registering without referrer");
            }
            referrer.map(|u| u.id)
        }
        _ => None,
    };
    let code = mint_referral_code(uow, &name).await?;
    let user = User::new(new_id(), name, email, role, referrer_id, code);
    uow.put(&user)?;
    info!(user_id = %user.id, referral_code = %user.referral_code, referrer = ?user.referrer_id, "User registered");
    Ok(user)
}

pub async fn register(
    uow: &mut UnitOfWork<'_>,
    registration: Registration,
    settings: &LedgerSettings,
) -> LedgerResult<User> {
    if !settings.registration_open {
        return Err(LedgerError::RegistrationClosed);
    }
    create(uow, registration, Role::User).await
}

/// Returns the existing administrator, creating one when there is none.
pub async fn ensure_admin(uow: &mut UnitOfWork<'_>, name: &str, email: &str) -> LedgerResult<User> {
    if let Some(admin) = uow.scan::<User>().await?.into_iter().find(User::is_admin) {
        return Ok(admin);
    }
    create(uow, Registration::new(name, email), Role::Admin).await
}

/// Points `user_id` at a new upline, or detaches it when `referrer_id` is `None`.
///
/// Rejects any referrer whose own upline already contains `user_id`.
pub async fn reassign_referrer(
    uow: &mut UnitOfWork<'_>,
    user_id: &str,
    referrer_id: Option<String>,
) -> LedgerResult<User> {
    let mut user = load_user(uow, user_id).await?;
    if let Some(candidate) = referrer_id.as_deref() {
        let mut seen = HashSet::new();
        let mut cursor = Some(load_user(uow, candidate).await?);
        while let Some(ancestor) = cursor {
            if ancestor.id == user.id {
                return Err(LedgerError::Validation(format!(
                    "{} cannot refer {}: referral cycle",
                    candidate, user.id
                )));
            }
            if !seen.insert(ancestor.id.clone()) {
                break;
            }
            cursor = match ancestor.referrer_id {
                Some(next) => uow.load::<User>(&next).await?,
                None => None,
            };
        }
    }
    user.referrer_id = referrer_id;
    uow.put(&user)?;
    Ok(user)
}

/// Removes a user and detaches their direct referrals. Their ledger entries stay.
pub async fn delete_user(uow: &mut UnitOfWork<'_>, actor_id: &str, user_id: &str) -> LedgerResult<()> {
    if actor_id == user_id {
        return Err(LedgerError::Validation("cannot delete your own account".to_string()));
    }
    load_user(uow, user_id).await?;
    for mut child in direct_referrals(uow, user_id).await? {
        child.referrer_id = None;
        uow.put(&child)?;
    }
    if uow.load::<Cart>(user_id).await?.is_some() {
        uow.delete::<Cart>(user_id)?;
    }
    uow.delete::<User>(user_id)?;
    info!(user_id, "User deleted");
    Ok(())
}

pub async fn direct_referrals(uow: &UnitOfWork<'_>, user_id: &str) -> LedgerResult<Vec<User>> {
    Ok(uow
        .scan::<User>()
        .await?
        .into_iter()
        .filter(|u| u.referrer_id.as_deref() == Some(user_id))
        .collect())
}

/// Number of distinct users anywhere below `user_id`.
pub async fn network_size(uow: &UnitOfWork<'_>, user_id: &str) -> LedgerResult<usize> {
    load_user(uow, user_id).await?;
    let mut children: HashMap<String, Vec<String>> = HashMap::new();
    for user in uow.scan::<User>().await? {
        if let Some(parent) = user.referrer_id {
            children.entry(parent).or_default().push(user.id);
        }
    }
    let mut seen = HashSet::from([user_id.to_string()]);
    let mut queue = VecDeque::from([user_id.to_string()]);
    while let Some(id) = queue.pop_front() {
        for child in children.get(&id).into_iter().flatten() {
            if seen.insert(child.clone()) {
                queue.push_back(child.clone());
            }
        }
    }
    Ok(seen.len() - 1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::test_support::{seed_admin, seed_user};
    use crate::store::MemoryStore;

    #[tokio::test]
    async fn registration_resolves_referral_code() {
        let store = MemoryStore::new();
        let settings = LedgerSettings::default();
        let mut uow = UnitOfWork::new(&store);

        let alice = register(&mut uow, Registration::new("Alice", "alice@example.com"), &settings)
            .await
            .unwrap();
        assert!(alice.referral_code.starts_with("ALI"));
        assert_eq!(alice.referrer_id, None);

        let code = alice.referral_code.to_lowercase();
        let bob = register(&mut uow, Registration::new("Bob", "bob@example.com").referred_by(code), &settings)
            .await
            .unwrap();
        assert_eq!(bob.referrer_id.as_deref(), Some(alice.id.as_str()));

        let carol = register(
            &mut uow,
            Registration::new("Carol", "carol@example.com").referred_by("NOPE42"),
            &settings,
        )
        .await
        .unwrap();
        assert_eq!(carol.referrer_id, None);
    }

    #[tokio::test]
    async fn registration_rejects_duplicates_and_closed_program() {
        let store = MemoryStore::new();
        let mut settings = LedgerSettings::default();
        let mut uow = UnitOfWork::new(&store);

        register(&mut uow, Registration::new("Alice", "alice@example.com"), &settings)
            .await
            .unwrap();
        assert!(matches!(
            register(&mut uow, Registration::new("Alice", "ALICE@example.com"), &settings).await,
            Err(LedgerError::AlreadyExists(_))
        ));

        settings.registration_open = false;
        assert_eq!(
            register(&mut uow, Registration::new("Zed", "zed@example.com"), &settings).await,
            Err(LedgerError::RegistrationClosed)
        );
    }

    #[tokio::test]
    async fn ensure_admin_is_idempotent() {
        let store = MemoryStore::new();
        let mut uow = UnitOfWork::new(&store);
        let first = ensure_admin(&mut uow, "Root", "root@example.com").await.unwrap();
        let second = ensure_admin(&mut uow, "Other", "other@example.com").await.unwrap();
        assert!(first.is_admin());
        assert_eq!(first.id, second.id);
        assert!(require_admin(&uow, &first.id).await.is_ok());
    }

    #[tokio::test]
    async fn reassignment_rejects_cycles() {
        let store = MemoryStore::new();
        seed_user(&store, "a", None).await;
        seed_user(&store, "b", Some("a")).await;
        seed_user(&store, "c", Some("b")).await;

        let mut uow = UnitOfWork::new(&store);
        assert!(matches!(
            reassign_referrer(&mut uow, "a", Some("c".to_string())).await,
            Err(LedgerError::Validation(_))
        ));
        assert!(matches!(
            reassign_referrer(&mut uow, "a", Some("a".to_string())).await,
            Err(LedgerError::Validation(_))
        ));
        assert_eq!(
            reassign_referrer(&mut uow, "a", Some("ghost".to_string())).await,
            Err(LedgerError::not_found("user", "ghost"))
        );

        let c = reassign_referrer(&mut uow, "c", Some("a".to_string())).await.unwrap();
        assert_eq!(c.referrer_id.as_deref(), Some("a"));
    }

    #[tokio::test]
    async fn deletion_detaches_downline() {
        let store = MemoryStore::new();
        seed_admin(&store, "admin").await;
        seed_user(&store, "a", None).await;
        seed_user(&store, "b", Some("a")).await;
        seed_user(&store, "c", Some("b")).await;

        let mut uow = UnitOfWork::new(&store);
        assert_eq!(network_size(&uow, "a").await.unwrap(), 2);

        delete_user(&mut uow, "admin", "b").await.unwrap();
        uow.commit().await.unwrap();

        let uow = UnitOfWork::new(&store);
        assert_eq!(load_user(&uow, "c").await.unwrap().referrer_id, None);
        assert_eq!(network_size(&uow, "a").await.unwrap(), 0);
        assert!(matches!(load_user(&uow, "b").await, Err(LedgerError::NotFound { .. })));
    }

    #[tokio::test]
    async fn network_size_terminates_on_cycles() {
        let store = MemoryStore::new();
        seed_user(&store, "a", Some("b")).await;
        seed_user(&store, "b", Some("a")).await;
        seed_user(&store, "c", Some("a")).await;

        let uow = UnitOfWork::new(&store);
        assert_eq!(network_size(&uow, "a").await.unwrap(), 2);
    }

    #[tokio::test]
    async fn non_admin_is_forbidden() {
        let store = MemoryStore::new();
        seed_user(&store, "a", None).await;
        let uow = UnitOfWork::new(&store);
        assert_eq!(require_admin(&uow, "a").await, Err(LedgerError::Forbidden("a".to_string())));
        assert_eq!(require_admin(&uow, "nobody").await, Err(LedgerError::Forbidden("nobody".to_string())));
    }
}
