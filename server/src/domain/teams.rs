//! Team formation
//!
//! Every mutating operation runs under one process-wide mutex so the
//! multi-row invariants (one team per user, join-code and name
//! uniqueness, owner membership) are serialized. Read-only queries do
//! not take it.

use rand::Rng;
use sqlx::SqlitePool;
use tokio::sync::Mutex;

use crate::api::types::ApiError;
use crate::core::constants::{
    JOIN_CODE_ALPHABET, JOIN_CODE_LEN, JOIN_CODE_RETRIES, TEAM_NAME_MAX_CHARS,
};
use crate::data::DbError;
use crate::data::repositories::teams;
use crate::data::types::{TeamMemberRow, TeamRow};

/// A member's standing inside their team
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rank {
    Owner,
    CoOwner,
    Member,
}

impl Rank {
    pub fn of(team: &TeamRow, user_id: &str) -> Self {
        if team.owner == user_id {
            Self::Owner
        } else if team.co_owner.as_deref() == Some(user_id) {
            Self::CoOwner
        } else {
            Self::Member
        }
    }
}

#[derive(Debug)]
pub struct TeamInfo {
    pub team: TeamRow,
    pub members: Vec<TeamMemberRow>,
}

fn random_join_code() -> String {
    let mut rng = rand::thread_rng();
    (0..JOIN_CODE_LEN)
        .map(|_| JOIN_CODE_ALPHABET[rng.gen_range(0..JOIN_CODE_ALPHABET.len())] as char)
        .collect()
}

pub struct TeamService {
    pool: SqlitePool,
    mutation: Mutex<()>,
}

impl TeamService {
    pub fn new(pool: SqlitePool) -> Self {
        Self {
            pool,
            mutation: Mutex::new(()),
        }
    }

    fn validate_name(name: &str) -> Result<(), ApiError> {
        if name.is_empty() {
            return Err(ApiError::NameRequired);
        }
        if name.chars().count() > TEAM_NAME_MAX_CHARS {
            return Err(ApiError::TeamNameTooLong);
        }
        Ok(())
    }

    /// Six characters from `[0-9A-Z]`, retried against the unique index
    async fn generate_join_code(&self) -> Result<String, ApiError> {
        self.unique_code_with(random_join_code).await
    }

    async fn unique_code_with(
        &self,
        mut generate: impl FnMut() -> String,
    ) -> Result<String, ApiError> {
        for _ in 0..JOIN_CODE_RETRIES {
            let code = generate();
            if teams::find_by_join_code(&self.pool, &code).await?.is_none() {
                return Ok(code);
            }
        }

        tracing::error!("failed to generate a unique join code");
        Err(ApiError::Wtf)
    }

    async fn team_of(&self, user_id: &str) -> Result<TeamRow, ApiError> {
        teams::find_by_member(&self.pool, user_id)
            .await?
            .ok_or(ApiError::NoTeam)
    }

    pub async fn create(&self, user_id: &str, name: &str) -> Result<TeamRow, ApiError> {
        Self::validate_name(name)?;

        let _guard = self.mutation.lock().await;

        if teams::find_by_member(&self.pool, user_id).await?.is_some() {
            return Err(ApiError::HasTeam);
        }
        if teams::find_by_name(&self.pool, name).await?.is_some() {
            return Err(ApiError::TeamNameTaken);
        }

        let join_code = self.generate_join_code().await?;
        teams::create(&self.pool, name, user_id, &join_code)
            .await
            .map_err(|e: DbError| {
                if e.is_unique_violation() {
                    ApiError::TeamNameTaken
                } else {
                    e.into()
                }
            })
    }

    pub async fn join(&self, user_id: &str, join_code: &str) -> Result<TeamRow, ApiError> {
        let _guard = self.mutation.lock().await;

        if teams::find_by_member(&self.pool, user_id).await?.is_some() {
            return Err(ApiError::HasTeam);
        }

        let team = teams::find_by_join_code(&self.pool, join_code)
            .await?
            .ok_or(ApiError::NotFound)?;
        if team.locked {
            return Err(ApiError::TeamLocked);
        }

        teams::add_member(&self.pool, &team.id, user_id).await?;
        Ok(team)
    }

    pub async fn leave(&self, user_id: &str) -> Result<(), ApiError> {
        let _guard = self.mutation.lock().await;

        let team = self.team_of(user_id).await?;
        if team.owner == user_id {
            return Err(ApiError::OwnerCantLeave);
        }

        teams::remove_member(&self.pool, &team.id, user_id).await?;
        if team.co_owner.as_deref() == Some(user_id) {
            teams::set_co_owner(&self.pool, &team.id, None).await?;
        }
        Ok(())
    }

    /// Caller's team with its member profiles; read-only, no mutex
    pub async fn info(&self, user_id: &str) -> Result<TeamInfo, ApiError> {
        let team = self.team_of(user_id).await?;
        let members = teams::members(&self.pool, &team.id).await?;
        Ok(TeamInfo { team, members })
    }

    pub async fn rename(&self, user_id: &str, name: &str) -> Result<(), ApiError> {
        Self::validate_name(name)?;

        let _guard = self.mutation.lock().await;

        let team = self.team_of(user_id).await?;
        if Rank::of(&team, user_id) == Rank::Member {
            return Err(ApiError::NotAuthorized);
        }
        if let Some(existing) = teams::find_by_name(&self.pool, name).await?
            && existing.id != team.id
        {
            return Err(ApiError::TeamNameTaken);
        }

        teams::update_name(&self.pool, &team.id, name).await?;
        Ok(())
    }

    pub async fn disband(&self, user_id: &str) -> Result<(), ApiError> {
        let _guard = self.mutation.lock().await;

        let team = self.team_of(user_id).await?;
        if team.owner != user_id {
            return Err(ApiError::NotAuthorized);
        }
        if teams::member_count(&self.pool, &team.id).await? > 1 {
            return Err(ApiError::DisbandNonEmptyTeam);
        }

        teams::delete(&self.pool, &team.id).await?;
        Ok(())
    }

    pub async fn change_lock(&self, user_id: &str, locked: bool) -> Result<(), ApiError> {
        let _guard = self.mutation.lock().await;

        let team = self.team_of(user_id).await?;
        if Rank::of(&team, user_id) == Rank::Member {
            return Err(ApiError::NotAuthorized);
        }

        teams::set_locked(&self.pool, &team.id, locked).await?;
        Ok(())
    }

    /// Promote a member to co-owner or demote the current co-owner.
    /// Owner only; the co-owner must be a member and never the owner.
    pub async fn change_co_owner(
        &self,
        user_id: &str,
        target: &str,
        should_co_owner: bool,
    ) -> Result<(), ApiError> {
        let _guard = self.mutation.lock().await;

        let team = self.team_of(user_id).await?;
        if team.owner != user_id {
            return Err(ApiError::NotAuthorized);
        }
        if target == team.owner {
            return Err(ApiError::NotAuthorized);
        }

        if should_co_owner {
            let is_member = teams::members(&self.pool, &team.id)
                .await?
                .iter()
                .any(|m| m.user_id == target);
            if !is_member {
                return Err(ApiError::NotFound);
            }
            teams::set_co_owner(&self.pool, &team.id, Some(target)).await?;
        } else {
            if team.co_owner.as_deref() != Some(target) {
                return Err(ApiError::NotFound);
            }
            teams::set_co_owner(&self.pool, &team.id, None).await?;
        }
        Ok(())
    }

    /// Owner may kick anyone but themselves; a co-owner only plain
    /// members; members nobody.
    pub async fn kick(&self, user_id: &str, target: &str) -> Result<(), ApiError> {
        let _guard = self.mutation.lock().await;

        let team = self.team_of(user_id).await?;
        if target == user_id {
            return Err(ApiError::NotAuthorized);
        }

        let is_member = teams::members(&self.pool, &team.id)
            .await?
            .iter()
            .any(|m| m.user_id == target);
        if !is_member {
            return Err(ApiError::NotFound);
        }

        let allowed = match Rank::of(&team, user_id) {
            Rank::Owner => true,
            Rank::CoOwner => Rank::of(&team, target) == Rank::Member,
            Rank::Member => false,
        };
        if !allowed {
            return Err(ApiError::NotAuthorized);
        }

        teams::remove_member(&self.pool, &team.id, target).await?;
        if team.co_owner.as_deref() == Some(target) {
            teams::set_co_owner(&self.pool, &team.id, None).await?;
        }
        Ok(())
    }

    pub async fn regenerate_join_code(&self, user_id: &str) -> Result<String, ApiError> {
        let _guard = self.mutation.lock().await;

        let team = self.team_of(user_id).await?;
        if Rank::of(&team, user_id) == Rank::Member {
            return Err(ApiError::NotAuthorized);
        }

        let code = self.generate_join_code().await?;
        teams::set_join_code(&self.pool, &team.id, &code).await?;
        Ok(code)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::repositories::users;
    use crate::data::test_pool;

    async fn service() -> TeamService {
        TeamService::new(test_pool().await)
    }

    async fn user(service: &TeamService, email: &str) -> String {
        users::create(&service.pool, email, "hash", "test", "test", 0)
            .await
            .unwrap()
            .id
    }

    #[tokio::test]
    async fn test_create_happy_path() {
        let service = service().await;
        let a = user(&service, "a@test.test").await;

        let team = service.create(&a, "test").await.unwrap();
        assert_eq!(team.owner, a);
        assert_eq!(team.join_code.len(), JOIN_CODE_LEN);
        assert!(team.join_code.bytes().all(|b| JOIN_CODE_ALPHABET.contains(&b)));
    }

    #[tokio::test]
    async fn test_create_name_rules() {
        let service = service().await;
        let a = user(&service, "a@test.test").await;

        assert_eq!(
            service.create(&a, "").await.unwrap_err(),
            ApiError::NameRequired
        );

        let max = "a".repeat(TEAM_NAME_MAX_CHARS);
        service.create(&a, &max).await.unwrap();

        let b = user(&service, "b@test.test").await;
        let too_long = "a".repeat(TEAM_NAME_MAX_CHARS + 1);
        assert_eq!(
            service.create(&b, &too_long).await.unwrap_err(),
            ApiError::TeamNameTooLong
        );
    }

    #[tokio::test]
    async fn test_create_name_taken_and_has_team() {
        let service = service().await;
        let a = user(&service, "a@test.test").await;
        let b = user(&service, "b@test.test").await;

        service.create(&a, "test").await.unwrap();
        assert_eq!(
            service.create(&b, "test").await.unwrap_err(),
            ApiError::TeamNameTaken
        );
        assert_eq!(
            service.create(&a, "other").await.unwrap_err(),
            ApiError::HasTeam
        );
    }

    #[tokio::test]
    async fn test_join_by_code() {
        let service = service().await;
        let a = user(&service, "a@test.test").await;
        let b = user(&service, "b@test.test").await;

        let team = service.create(&a, "test").await.unwrap();

        assert_eq!(
            service.join(&b, "ZZZZZZ").await.unwrap_err(),
            ApiError::NotFound
        );

        let joined = service.join(&b, &team.join_code).await.unwrap();
        assert_eq!(joined.id, team.id);
        assert_eq!(
            service.join(&b, &team.join_code).await.unwrap_err(),
            ApiError::HasTeam
        );
    }

    #[tokio::test]
    async fn test_join_locked_team() {
        let service = service().await;
        let a = user(&service, "a@test.test").await;
        let b = user(&service, "b@test.test").await;

        let team = service.create(&a, "test").await.unwrap();
        service.change_lock(&a, true).await.unwrap();
        assert_eq!(
            service.join(&b, &team.join_code).await.unwrap_err(),
            ApiError::TeamLocked
        );
    }

    #[tokio::test]
    async fn test_leave_rules() {
        let service = service().await;
        let a = user(&service, "a@test.test").await;
        let b = user(&service, "b@test.test").await;

        let team = service.create(&a, "test").await.unwrap();
        service.join(&b, &team.join_code).await.unwrap();
        service.change_co_owner(&a, &b, true).await.unwrap();

        assert_eq!(service.leave(&a).await.unwrap_err(), ApiError::OwnerCantLeave);

        service.leave(&b).await.unwrap();
        let info = service.info(&a).await.unwrap();
        assert!(info.team.co_owner.is_none());
        assert_eq!(info.members.len(), 1);
    }

    #[tokio::test]
    async fn test_kick_matrix() {
        let service = service().await;
        let owner = user(&service, "owner@test.test").await;
        let co_owner = user(&service, "co@test.test").await;
        let member = user(&service, "member@test.test").await;

        let team = service.create(&owner, "test").await.unwrap();
        service.join(&co_owner, &team.join_code).await.unwrap();
        service.join(&member, &team.join_code).await.unwrap();
        service.change_co_owner(&owner, &co_owner, true).await.unwrap();

        // self-kick is always refused
        for id in [&owner, &co_owner, &member] {
            assert_eq!(service.kick(id, id).await.unwrap_err(), ApiError::NotAuthorized);
        }

        // member may kick nobody, co-owner may not touch the owner
        assert_eq!(
            service.kick(&member, &co_owner).await.unwrap_err(),
            ApiError::NotAuthorized
        );
        assert_eq!(
            service.kick(&co_owner, &owner).await.unwrap_err(),
            ApiError::NotAuthorized
        );

        // co-owner kicks a plain member
        service.kick(&co_owner, &member).await.unwrap();

        // owner kicks the co-owner, which also clears the role
        service.kick(&owner, &co_owner).await.unwrap();
        let info = service.info(&owner).await.unwrap();
        assert!(info.team.co_owner.is_none());
        assert_eq!(info.members.len(), 1);
    }

    #[tokio::test]
    async fn test_disband_rules() {
        let service = service().await;
        let a = user(&service, "a@test.test").await;
        let b = user(&service, "b@test.test").await;

        let team = service.create(&a, "test").await.unwrap();
        service.join(&b, &team.join_code).await.unwrap();

        assert_eq!(service.disband(&b).await.unwrap_err(), ApiError::NotAuthorized);
        assert_eq!(
            service.disband(&a).await.unwrap_err(),
            ApiError::DisbandNonEmptyTeam
        );

        service.kick(&a, &b).await.unwrap();
        service.disband(&a).await.unwrap();
        assert_eq!(service.info(&a).await.unwrap_err(), ApiError::NoTeam);
    }

    #[tokio::test]
    async fn test_co_owner_rules() {
        let service = service().await;
        let a = user(&service, "a@test.test").await;
        let b = user(&service, "b@test.test").await;
        let outsider = user(&service, "c@test.test").await;

        let team = service.create(&a, "test").await.unwrap();
        service.join(&b, &team.join_code).await.unwrap();

        // owner cannot be their own co-owner, outsiders are not members
        assert_eq!(
            service.change_co_owner(&a, &a, true).await.unwrap_err(),
            ApiError::NotAuthorized
        );
        assert_eq!(
            service.change_co_owner(&a, &outsider, true).await.unwrap_err(),
            ApiError::NotFound
        );
        // only the owner may promote
        assert_eq!(
            service.change_co_owner(&b, &b, true).await.unwrap_err(),
            ApiError::NotAuthorized
        );

        service.change_co_owner(&a, &b, true).await.unwrap();
        let info = service.info(&a).await.unwrap();
        assert_eq!(info.team.co_owner.as_deref(), Some(b.as_str()));

        service.change_co_owner(&a, &b, false).await.unwrap();
        assert!(service.info(&a).await.unwrap().team.co_owner.is_none());
    }

    #[tokio::test]
    async fn test_rename() {
        let service = service().await;
        let a = user(&service, "a@test.test").await;
        let b = user(&service, "b@test.test").await;

        service.create(&a, "one").await.unwrap();
        let team_b = service.create(&b, "two").await.unwrap();

        assert_eq!(
            service.rename(&a, "two").await.unwrap_err(),
            ApiError::TeamNameTaken
        );
        service.rename(&a, "three").await.unwrap();
        assert_eq!(service.info(&a).await.unwrap().team.name, "three");

        // renaming to the current name is a no-op, not a conflict
        service.rename(&b, &team_b.name).await.unwrap();

        // plain members may not rename
        let c = user(&service, "c@test.test").await;
        service.join(&c, &team_b.join_code).await.unwrap();
        assert_eq!(
            service.rename(&c, "four").await.unwrap_err(),
            ApiError::NotAuthorized
        );
    }

    #[tokio::test]
    async fn test_join_code_collisions_exhaust_retries() {
        let service = service().await;
        let a = user(&service, "a@test.test").await;
        teams::create(&service.pool, "taken", &a, "AAAAAA").await.unwrap();

        let mut attempts = 0;
        let err = service
            .unique_code_with(|| {
                attempts += 1;
                "AAAAAA".to_string()
            })
            .await
            .unwrap_err();
        assert_eq!(err, ApiError::Wtf);
        assert_eq!(attempts, JOIN_CODE_RETRIES);
    }

    #[tokio::test]
    async fn test_regenerate_join_code() {
        let service = service().await;
        let a = user(&service, "a@test.test").await;

        let team = service.create(&a, "test").await.unwrap();
        let code = service.regenerate_join_code(&a).await.unwrap();
        assert_eq!(code.len(), JOIN_CODE_LEN);

        // the old code no longer admits anyone
        let b = user(&service, "b@test.test").await;
        if code != team.join_code {
            assert_eq!(
                service.join(&b, &team.join_code).await.unwrap_err(),
                ApiError::NotFound
            );
        }
        service.join(&b, &code).await.unwrap();
    }
}
