//! Invitation workflow
//!
//! Sending an invite issues it on the group, mails it, and hands it to a
//! scheduler. The scheduler sends one reminder a day before expiry (when
//! that instant is still ahead and after issue) and expires the invite once
//! its validity ends. Expiring an invite that was accepted meanwhile is a
//! no-op on the aggregate.

use std::future::Future;
use std::sync::{Arc, Mutex};
use std::time::Duration as StdDuration;

use chrono::{DateTime, Duration, Utc};
use shutterclub_core::GroupRepository;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tokio::time::{sleep_until, Instant};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::{AppError, Result};
use crate::service::{GroupService, IssuedInvite};
use crate::tokens::InviteTokenGenerator;

/// Attempts per follow-up before giving up
pub const FOLLOW_UP_MAX_ATTEMPTS: u32 = 5;
const FOLLOW_UP_INITIAL_BACKOFF: StdDuration = StdDuration::from_secs(10);

pub fn default_reminder_lead() -> Duration {
    Duration::days(1)
}

/// Everything needed to mail an invite and follow it up
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvitationRequest {
    pub group_id: Uuid,
    pub invite_id: Uuid,
    pub email: String,
    pub token: String,
    pub issued_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl From<IssuedInvite> for InvitationRequest {
    fn from(issued: IssuedInvite) -> Self {
        Self {
            group_id: issued.group_id,
            invite_id: issued.invite_id,
            email: issued.email,
            token: issued.token,
            issued_at: issued.issued_at,
            expires_at: issued.expires_at,
        }
    }
}

/// When the follow-ups for one invite are due
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReminderPlan {
    pub reminder_at: Option<DateTime<Utc>>,
    pub expires_at: DateTime<Utc>,
}

impl ReminderPlan {
    pub fn new(issued_at: DateTime<Utc>, expires_at: DateTime<Utc>, now: DateTime<Utc>) -> Self {
        Self::with_lead(issued_at, expires_at, now, default_reminder_lead())
    }

    pub fn with_lead(
        issued_at: DateTime<Utc>,
        expires_at: DateTime<Utc>,
        now: DateTime<Utc>,
        lead: Duration,
    ) -> Self {
        let reminder_at = expires_at
            .checked_sub_signed(lead)
            .filter(|candidate| *candidate > issued_at && *candidate > now);
        Self {
            reminder_at,
            expires_at,
        }
    }
}

/// Delivery failures are reported as `AppError::Mail`
pub trait InviteMailer: Send + Sync {
    fn send_invite(&self, request: &InvitationRequest) -> Result<()>;
    fn send_reminder(&self, request: &InvitationRequest) -> Result<()>;
}

/// Stands in for an outbound mail service by logging each message
#[derive(Debug, Default, Clone, Copy)]
pub struct LoggingMailer;

impl InviteMailer for LoggingMailer {
    fn send_invite(&self, request: &InvitationRequest) -> Result<()> {
        info!(
            group_id = %request.group_id,
            invite_id = %request.invite_id,
            email = %request.email,
            expires_at = %request.expires_at,
            "invite mail sent"
        );
        debug!(token = %request.token, "invite token");
        Ok(())
    }

    fn send_reminder(&self, request: &InvitationRequest) -> Result<()> {
        info!(
            group_id = %request.group_id,
            invite_id = %request.invite_id,
            email = %request.email,
            "invite reminder sent"
        );
        Ok(())
    }
}

pub trait InvitationScheduler: Send + Sync {
    fn schedule(&self, request: InvitationRequest) -> Result<()>;
}

/// Records the plan without running it. For one-shot processes that exit
/// before any follow-up would fire.
#[derive(Debug, Clone, Copy)]
pub struct LoggingScheduler {
    reminder_lead: Duration,
}

impl LoggingScheduler {
    pub fn new(reminder_lead: Duration) -> Self {
        Self { reminder_lead }
    }
}

impl InvitationScheduler for LoggingScheduler {
    fn schedule(&self, request: InvitationRequest) -> Result<()> {
        let plan = ReminderPlan::with_lead(request.issued_at, request.expires_at, request.issued_at, self.reminder_lead);
        info!(
            invite_id = %request.invite_id,
            reminder_at = ?plan.reminder_at,
            expires_at = %plan.expires_at,
            "invite follow-ups planned"
        );
        Ok(())
    }
}

/// Runs each invite's follow-ups as a task on a tokio runtime. Timers live
/// in memory only and are lost when the process exits.
pub struct TokioInvitationScheduler<R> {
    runtime: Handle,
    service: Arc<GroupService<R>>,
    mailer: Arc<dyn InviteMailer>,
    reminder_lead: Duration,
    tasks: Mutex<Vec<JoinHandle<()>>>,
}

impl<R> TokioInvitationScheduler<R>
where
    R: GroupRepository + Send + Sync + 'static,
{
    pub fn new(runtime: Handle, service: Arc<GroupService<R>>, mailer: Arc<dyn InviteMailer>) -> Self {
        Self {
            runtime,
            service,
            mailer,
            reminder_lead: default_reminder_lead(),
            tasks: Mutex::new(Vec::new()),
        }
    }

    pub fn with_reminder_lead(mut self, lead: Duration) -> Self {
        self.reminder_lead = lead;
        self
    }

    /// Follow-ups that have not finished yet. Finished handles are dropped.
    pub fn pending(&self) -> usize {
        self.tasks
            .lock()
            .map(|mut tasks| {
                tasks.retain(|t| !t.is_finished());
                tasks.len()
            })
            .unwrap_or(0)
    }

    /// Wait for every scheduled follow-up to run to completion
    pub async fn wait_all(&self) {
        let tasks = match self.tasks.lock() {
            Ok(mut tasks) => std::mem::take(&mut *tasks),
            Err(_) => return,
        };
        for task in tasks {
            if let Err(e) = task.await {
                warn!(error = %e, "invite follow-up task failed");
            }
        }
    }

    /// Cancel every pending follow-up
    pub fn shutdown(&self) {
        if let Ok(mut tasks) = self.tasks.lock() {
            for task in tasks.drain(..) {
                task.abort();
            }
        }
    }
}

impl<R> InvitationScheduler for TokioInvitationScheduler<R>
where
    R: GroupRepository + Send + Sync + 'static,
{
    fn schedule(&self, request: InvitationRequest) -> Result<()> {
        let now = self.service.now();
        let plan = ReminderPlan::with_lead(request.issued_at, request.expires_at, now, self.reminder_lead);
        debug!(invite_id = %request.invite_id, reminder_at = ?plan.reminder_at, expires_at = %plan.expires_at, "scheduling invite follow-ups");

        let task = self.runtime.spawn(run_follow_ups(
            self.service.clone(),
            self.mailer.clone(),
            plan,
            now,
            request,
        ));
        let mut tasks = self
            .tasks
            .lock()
            .map_err(|_| AppError::Scheduling("task list lock poisoned".into()))?;
        tasks.retain(|t| !t.is_finished());
        tasks.push(task);
        Ok(())
    }
}

async fn run_follow_ups<R>(
    service: Arc<GroupService<R>>,
    mailer: Arc<dyn InviteMailer>,
    plan: ReminderPlan,
    scheduled_at: DateTime<Utc>,
    request: InvitationRequest,
) where
    R: GroupRepository + Send + Sync + 'static,
{
    let started = Instant::now();
    let (group_id, invite_id) = (request.group_id, request.invite_id);

    if let Some(reminder_at) = plan.reminder_at {
        sleep_until(deadline(started, scheduled_at, reminder_at)).await;
        let sent = with_retries("invite reminder", invite_id, || {
            std::future::ready(mailer.send_reminder(&request))
        })
        .await;
        if let Err(e) = sent {
            warn!(%group_id, %invite_id, error = %e, "invite reminder abandoned");
        }
    }

    sleep_until(deadline(started, scheduled_at, plan.expires_at)).await;

    let expired = with_retries("invite expiry", invite_id, || {
        let service = service.clone();
        async move {
            let expired_at = service.now().max(plan.expires_at);
            tokio::task::spawn_blocking(move || service.expire_invite(group_id, invite_id, expired_at))
                .await
                .unwrap_or_else(|e| Err(AppError::Scheduling(e.to_string())))
        }
    })
    .await;
    match expired {
        Ok(()) => info!(%group_id, %invite_id, "invite expiry processed"),
        Err(e) => warn!(%group_id, %invite_id, error = %e, "invite expiry abandoned"),
    }
}

/// Runtime instant matching wall-clock `at`, measured from when the task started
fn deadline(started: Instant, scheduled_at: DateTime<Utc>, at: DateTime<Utc>) -> Instant {
    started + (at - scheduled_at).to_std().unwrap_or_default()
}

/// Retry a follow-up with exponential backoff. Permanent failures stop at once.
async fn with_retries<F, Fut>(activity: &'static str, invite_id: Uuid, mut attempt: F) -> Result<()>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<()>>,
{
    let mut backoff = FOLLOW_UP_INITIAL_BACKOFF;
    let mut tries = 1;
    loop {
        match attempt().await {
            Ok(()) => return Ok(()),
            Err(e) if e.is_permanent() || tries >= FOLLOW_UP_MAX_ATTEMPTS => return Err(e),
            Err(e) => {
                warn!(%invite_id, attempt = tries, error = %e, "{activity} failed, retrying");
                tokio::time::sleep(backoff).await;
                backoff *= 2;
                tries += 1;
            }
        }
    }
}

/// Issues, mails and schedules invites
pub struct InviteSender<R> {
    service: Arc<GroupService<R>>,
    tokens: Arc<dyn InviteTokenGenerator>,
    mailer: Arc<dyn InviteMailer>,
    scheduler: Arc<dyn InvitationScheduler>,
    default_validity: Duration,
}

impl<R: GroupRepository> InviteSender<R> {
    pub fn new(
        service: Arc<GroupService<R>>,
        tokens: Arc<dyn InviteTokenGenerator>,
        mailer: Arc<dyn InviteMailer>,
        scheduler: Arc<dyn InvitationScheduler>,
        default_validity: Duration,
    ) -> Self {
        Self {
            service,
            tokens,
            mailer,
            scheduler,
            default_validity,
        }
    }

    /// The invite is saved before mailing; a mail or scheduling failure is
    /// reported but leaves the invite in place
    pub fn send_invite(
        &self,
        group_id: Uuid,
        inviter_membership_id: Uuid,
        email: &str,
        valid_for: Option<Duration>,
    ) -> Result<IssuedInvite> {
        let token = self.tokens.generate();
        let issued = self.service.issue_invite(
            group_id,
            inviter_membership_id,
            email,
            &token,
            valid_for.unwrap_or(self.default_validity),
        )?;

        let request = InvitationRequest::from(issued.clone());
        self.mailer.send_invite(&request)?;
        self.scheduler.schedule(request)?;
        Ok(issued)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::{FixedClock, UuidGenerator};
    use crate::events::TracingDispatcher;
    use crate::tokens::RandomTokenGenerator;
    use chrono::TimeZone;
    use shutterclub_core::{InMemoryGroupRepository, InviteStatus, MembershipRole};

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 9, 1, 12, 0, 0).unwrap()
    }

    #[derive(Default)]
    struct RecordingMailer {
        invites: Mutex<Vec<Uuid>>,
        reminders: Mutex<Vec<Uuid>>,
    }

    impl InviteMailer for RecordingMailer {
        fn send_invite(&self, request: &InvitationRequest) -> Result<()> {
            self.invites.lock().unwrap().push(request.invite_id);
            Ok(())
        }

        fn send_reminder(&self, request: &InvitationRequest) -> Result<()> {
            self.reminders.lock().unwrap().push(request.invite_id);
            Ok(())
        }
    }

    /// Fails the first `failures` reminders
    #[derive(Default)]
    struct FlakyMailer {
        failures: Mutex<u32>,
        attempts: Mutex<u32>,
    }

    impl InviteMailer for FlakyMailer {
        fn send_invite(&self, _: &InvitationRequest) -> Result<()> {
            Ok(())
        }

        fn send_reminder(&self, _: &InvitationRequest) -> Result<()> {
            *self.attempts.lock().unwrap() += 1;
            let mut failures = self.failures.lock().unwrap();
            if *failures > 0 {
                *failures -= 1;
                return Err(AppError::Mail("smtp relay unavailable".into()));
            }
            Ok(())
        }
    }

    #[derive(Default)]
    struct RecordingScheduler {
        requests: Mutex<Vec<InvitationRequest>>,
    }

    impl InvitationScheduler for RecordingScheduler {
        fn schedule(&self, request: InvitationRequest) -> Result<()> {
            self.requests.lock().unwrap().push(request);
            Ok(())
        }
    }

    fn service() -> (Arc<GroupService<InMemoryGroupRepository>>, Uuid, Uuid) {
        let service = Arc::new(GroupService::new(
            InMemoryGroupRepository::new(),
            Arc::new(FixedClock::new(t0())),
            Arc::new(UuidGenerator),
            Arc::new(TracingDispatcher),
        ));
        let group_id = service.create_group("invites", None).unwrap();
        let owner = service
            .add_member(group_id, Uuid::new_v4(), MembershipRole::Owner)
            .unwrap();
        (service, group_id, owner)
    }

    #[test]
    fn test_reminder_a_day_before_expiry() {
        let plan = ReminderPlan::new(t0(), t0() + Duration::days(3), t0());
        assert_eq!(plan.reminder_at, Some(t0() + Duration::days(2)));
        assert_eq!(plan.expires_at, t0() + Duration::days(3));
    }

    #[test]
    fn test_no_reminder_for_short_invites() {
        let plan = ReminderPlan::new(t0(), t0() + Duration::hours(12), t0());
        assert_eq!(plan.reminder_at, None);

        let exactly_one_day = ReminderPlan::new(t0(), t0() + Duration::days(1), t0());
        assert_eq!(exactly_one_day.reminder_at, None);
    }

    #[test]
    fn test_no_reminder_once_past() {
        let late = t0() + Duration::days(2) + Duration::minutes(1);
        let plan = ReminderPlan::new(t0(), t0() + Duration::days(3), late);
        assert_eq!(plan.reminder_at, None);
    }

    #[test]
    fn test_send_invite_mails_and_schedules() {
        let (service, group_id, owner) = service();
        let mailer = Arc::new(RecordingMailer::default());
        let scheduler = Arc::new(RecordingScheduler::default());
        let sender = InviteSender::new(
            service.clone(),
            Arc::new(RandomTokenGenerator::default()),
            mailer.clone(),
            scheduler.clone(),
            Duration::hours(72),
        );

        let issued = sender.send_invite(group_id, owner, "guest@example.org", None).unwrap();
        assert_eq!(issued.expires_at, t0() + Duration::hours(72));
        assert_eq!(issued.token.len(), 32);
        assert_eq!(*mailer.invites.lock().unwrap(), vec![issued.invite_id]);

        let requests = scheduler.requests.lock().unwrap();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].token, issued.token);

        let group = service.group(group_id).unwrap();
        assert!(group.invite_by_token(&issued.token).is_ok());
    }

    #[test]
    fn test_rejected_invite_is_not_mailed() {
        let (service, group_id, _) = service();
        let mailer = Arc::new(RecordingMailer::default());
        let sender = InviteSender::new(
            service,
            Arc::new(RandomTokenGenerator::default()),
            mailer.clone(),
            Arc::new(LoggingScheduler::new(default_reminder_lead())),
            Duration::hours(72),
        );

        assert!(sender.send_invite(group_id, Uuid::new_v4(), "guest@example.org", None).is_err());
        assert!(mailer.invites.lock().unwrap().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_follow_ups_remind_then_expire() {
        let (service, group_id, owner) = service();
        let mailer = Arc::new(RecordingMailer::default());
        let scheduler = TokioInvitationScheduler::new(Handle::current(), service.clone(), mailer.clone());

        let issued = service
            .issue_invite(group_id, owner, "late@example.org", "late-token", Duration::days(3))
            .unwrap();
        scheduler.schedule(issued.clone().into()).unwrap();
        scheduler.wait_all().await;

        assert_eq!(*mailer.reminders.lock().unwrap(), vec![issued.invite_id]);
        let group = service.group(group_id).unwrap();
        assert_eq!(
            group.invite(issued.invite_id).unwrap().status(),
            InviteStatus::Expired { at: issued.expires_at }
        );
        assert_eq!(scheduler.pending(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_accepted_invite_survives_expiry() {
        let (service, group_id, owner) = service();
        let scheduler = TokioInvitationScheduler::new(Handle::current(), service.clone(), Arc::new(LoggingMailer));

        let issued = service
            .issue_invite(group_id, owner, "quick@example.org", "quick", Duration::hours(6))
            .unwrap();
        service.accept_invite(group_id, "quick", Uuid::new_v4()).unwrap();
        scheduler.schedule(issued.clone().into()).unwrap();
        scheduler.wait_all().await;

        let status = service.group(group_id).unwrap().invite(issued.invite_id).unwrap().status();
        assert!(matches!(status, InviteStatus::Accepted { .. }));
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_reminder_is_retried() {
        let (service, group_id, owner) = service();
        let mailer = Arc::new(FlakyMailer {
            failures: Mutex::new(1),
            ..FlakyMailer::default()
        });
        let scheduler = TokioInvitationScheduler::new(Handle::current(), service.clone(), mailer.clone());

        let issued = service
            .issue_invite(group_id, owner, "flaky@example.org", "flaky", Duration::days(2))
            .unwrap();
        scheduler.schedule(issued.clone().into()).unwrap();
        scheduler.wait_all().await;

        assert_eq!(*mailer.attempts.lock().unwrap(), 2);
        let status = service.group(group_id).unwrap().invite(issued.invite_id).unwrap().status();
        assert_eq!(status, InviteStatus::Expired { at: issued.expires_at });
    }

    #[tokio::test(start_paused = true)]
    async fn test_retries_back_off_then_give_up() {
        let started = Instant::now();
        let mut calls = 0;
        let outcome = with_retries("test activity", Uuid::new_v4(), || {
            calls += 1;
            std::future::ready(Err(AppError::Mail("down".into())))
        })
        .await;

        assert!(matches!(outcome, Err(AppError::Mail(_))));
        assert_eq!(calls, FOLLOW_UP_MAX_ATTEMPTS);
        // 10 + 20 + 40 + 80 seconds between the five attempts
        let waited = started.elapsed();
        assert!(waited >= StdDuration::from_secs(150) && waited < StdDuration::from_secs(151));
    }

    #[tokio::test(start_paused = true)]
    async fn test_permanent_failure_is_not_retried() {
        let mut calls = 0;
        let outcome = with_retries("test activity", Uuid::new_v4(), || {
            calls += 1;
            std::future::ready(Err(AppError::Core(shutterclub_core::Error::InvalidOperation(
                "gone".into(),
            ))))
        })
        .await;

        assert!(outcome.is_err());
        assert_eq!(calls, 1);
    }

    #[tokio::test]
    async fn test_finished_follow_ups_are_released() {
        let clock = Arc::new(FixedClock::new(t0()));
        let service = Arc::new(GroupService::new(
            InMemoryGroupRepository::new(),
            clock.clone(),
            Arc::new(UuidGenerator),
            Arc::new(TracingDispatcher),
        ));
        let group_id = service.create_group("released", None).unwrap();
        let owner = service
            .add_member(group_id, Uuid::new_v4(), MembershipRole::Owner)
            .unwrap();
        let scheduler = TokioInvitationScheduler::new(Handle::current(), service.clone(), Arc::new(LoggingMailer));

        let issued: Vec<IssuedInvite> = (0..3)
            .map(|i| {
                service
                    .issue_invite(
                        group_id,
                        owner,
                        &format!("guest{i}@example.org"),
                        &format!("done-{i}"),
                        Duration::hours(1),
                    )
                    .unwrap()
            })
            .collect();
        clock.advance(Duration::hours(2));
        for invite in &issued {
            scheduler.schedule(invite.clone().into()).unwrap();
        }

        for _ in 0..500 {
            if scheduler.pending() == 0 {
                break;
            }
            tokio::time::sleep(StdDuration::from_millis(10)).await;
        }
        assert_eq!(scheduler.pending(), 0);
        assert!(scheduler.tasks.lock().unwrap().is_empty());

        let group = service.group(group_id).unwrap();
        assert!(issued
            .iter()
            .all(|i| matches!(group.invite(i.invite_id).unwrap().status(), InviteStatus::Expired { .. })));
    }
}
