//! Turning an Inferno event into an event on the signed-in user's calendar.
//!
//! The Inferno lookup is allowed to fail: when it does, a fixed placeholder event is written
//! to the calendar instead and the failure is only logged.

use crate::domain::calendar::driven_ports::EventSource;
use crate::domain::calendar::driving_ports::EventError;
use crate::domain::directory::driven_ports::{DelegatedTokenSource, DirectoryApi};
use crate::domain::directory::{CALENDAR_EVENT_SCOPES, UserProfile};
use crate::external_connections::ExternalConnectivity;
use anyhow::Context;
use chrono::{DateTime, FixedOffset, Offset};
use chrono_tz::Tz;
use tracing::{info, warn};

/// Event ID used when a caller doesn't name an Inferno event
pub const PLACEHOLDER_EVENT_ID: &str = "248d8ea0-b518-493d-b9c1-0a9f3e4e94c7";

/// Wall clock format the calendar provider expects next to a time zone name
const LOCAL_DATE_TIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

const DEFAULT_TIME_ZONE: &str = "Pacific Standard Time";
const DEFAULT_SUBJECT: &str = "Let's go for lunch";
const DEFAULT_BODY: &str = "Does noon work for you?";
const DEFAULT_START: &str = "2021-03-30T10:00:00";
const DEFAULT_END: &str = "2021-03-30T11:00:00";

/// An event as described by the Inferno events API
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InfernoEvent {
    pub id: String,
    pub name: String,
    pub description: String,
    pub client_id: String,
    pub pre_roll: DateTime<FixedOffset>,
    pub start_time: DateTime<FixedOffset>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BodyType {
    Text,
    Html,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemBody {
    pub content_type: BodyType,
    pub content: String,
}

/// A wall clock reading paired with the name of the time zone it was read in
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DateTimeTimeZone {
    pub date_time: String,
    pub time_zone: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttendeeType {
    Required,
    Optional,
    Resource,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmailAddress {
    pub address: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attendee {
    pub email_address: EmailAddress,
    pub attendee_type: AttendeeType,
}

/// An event on a user's calendar. `id` and `web_link` are only known once the calendar provider
/// has created the event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CalendarEvent {
    pub id: Option<String>,
    pub subject: String,
    pub body: ItemBody,
    pub start: DateTimeTimeZone,
    pub end: DateTimeTimeZone,
    pub attendees: Vec<Attendee>,
    pub web_link: Option<String>,
}

/// Resolves the standard time zone name to stamp on an event starting at a given instant
pub trait TimeZoneResolver {
    fn standard_name(&self, instant: &DateTime<FixedOffset>) -> String;
}

/// Windows standard zone names paired with a zone that follows the same rules. A name is chosen
/// when its zone is at the instant's offset at that instant, so daylight saving readings resolve
/// to the zone actually observing them. Instants no zone matches resolve to the fallback name.
pub struct StandardTimeZoneNames {
    zones: &'static [(&'static str, Tz)],
    fallback: &'static str,
}

const WINDOWS_STANDARD_NAMES: &[(&str, Tz)] = &[
    ("Hawaiian Standard Time", chrono_tz::Pacific::Honolulu),
    ("Alaskan Standard Time", chrono_tz::America::Anchorage),
    ("Pacific Standard Time", chrono_tz::America::Los_Angeles),
    ("Mountain Standard Time", chrono_tz::America::Denver),
    ("US Mountain Standard Time", chrono_tz::America::Phoenix),
    ("Central Standard Time", chrono_tz::America::Chicago),
    ("Eastern Standard Time", chrono_tz::America::New_York),
    ("Atlantic Standard Time", chrono_tz::America::Halifax),
    ("E. South America Standard Time", chrono_tz::America::Sao_Paulo),
    ("UTC", chrono_tz::UTC),
    ("GMT Standard Time", chrono_tz::Europe::London),
    ("W. Europe Standard Time", chrono_tz::Europe::Berlin),
    ("FLE Standard Time", chrono_tz::Europe::Helsinki),
    ("Russian Standard Time", chrono_tz::Europe::Moscow),
    ("Arabian Standard Time", chrono_tz::Asia::Dubai),
    ("India Standard Time", chrono_tz::Asia::Kolkata),
    ("China Standard Time", chrono_tz::Asia::Shanghai),
    ("Tokyo Standard Time", chrono_tz::Asia::Tokyo),
    ("AUS Eastern Standard Time", chrono_tz::Australia::Sydney),
    ("New Zealand Standard Time", chrono_tz::Pacific::Auckland),
];

impl Default for StandardTimeZoneNames {
    fn default() -> Self {
        StandardTimeZoneNames {
            zones: WINDOWS_STANDARD_NAMES,
            fallback: DEFAULT_TIME_ZONE,
        }
    }
}

impl TimeZoneResolver for StandardTimeZoneNames {
    fn standard_name(&self, instant: &DateTime<FixedOffset>) -> String {
        let offset_seconds = instant.offset().local_minus_utc();

        self.zones
            .iter()
            .find(|(_, zone)| {
                instant.with_timezone(zone).offset().fix().local_minus_utc() == offset_seconds
            })
            .map(|(name, _)| *name)
            .unwrap_or(self.fallback)
            .to_owned()
    }
}

/// Result of looking up an Inferno event
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchedEvent {
    Found(InfernoEvent),
    Unavailable,
}

/// Looks up an Inferno event. Any failure is logged and reported as [FetchedEvent::Unavailable]
/// rather than returned, since callers fall back to a placeholder event.
pub async fn fetch_event(
    event_id: &str,
    inferno_api_key: &str,
    ext_cxn: &mut impl ExternalConnectivity,
    event_source: &impl EventSource,
) -> FetchedEvent {
    match event_source
        .fetch_event(event_id, inferno_api_key, &mut *ext_cxn)
        .await
    {
        Ok(event) => FetchedEvent::Found(event),
        Err(fetch_err) => {
            warn!("Inferno event {event_id} is unavailable, using the placeholder event: {fetch_err:#}");
            FetchedEvent::Unavailable
        }
    }
}

/// Maps an Inferno event onto a calendar event. Both boundaries come from the event's start
/// time, so the result has no duration.
pub fn adapt(source: &InfernoEvent, time_zones: &impl TimeZoneResolver) -> CalendarEvent {
    let time_zone = time_zones.standard_name(&source.start_time);
    let local_start = source
        .start_time
        .format(LOCAL_DATE_TIME_FORMAT)
        .to_string();

    CalendarEvent {
        id: None,
        subject: source.name.clone(),
        body: ItemBody {
            content_type: BodyType::Html,
            content: format!("{}\n{}", source.name, source.description),
        },
        start: DateTimeTimeZone {
            date_time: local_start.clone(),
            time_zone: time_zone.clone(),
        },
        end: DateTimeTimeZone {
            date_time: local_start,
            time_zone,
        },
        attendees: Vec::new(),
        web_link: None,
    }
}

/// The placeholder event written when the Inferno event can't be fetched, with the signed-in
/// user as its only attendee
pub fn default_event(me: &UserProfile) -> CalendarEvent {
    CalendarEvent {
        id: None,
        subject: DEFAULT_SUBJECT.to_owned(),
        body: ItemBody {
            content_type: BodyType::Html,
            content: DEFAULT_BODY.to_owned(),
        },
        start: DateTimeTimeZone {
            date_time: DEFAULT_START.to_owned(),
            time_zone: DEFAULT_TIME_ZONE.to_owned(),
        },
        end: DateTimeTimeZone {
            date_time: DEFAULT_END.to_owned(),
            time_zone: DEFAULT_TIME_ZONE.to_owned(),
        },
        attendees: vec![Attendee {
            email_address: EmailAddress {
                address: me.user_principal_name.clone(),
                name: me.display_name.clone(),
            },
            attendee_type: AttendeeType::Required,
        }],
        web_link: None,
    }
}

/// A calendar event ready to be submitted, along with the time zone the provider should
/// interpret it in
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreparedEvent {
    pub event: CalendarEvent,
    pub time_zone: String,
}

pub fn prepare_event(
    fetched: &FetchedEvent,
    me: &UserProfile,
    time_zones: &impl TimeZoneResolver,
) -> PreparedEvent {
    match fetched {
        FetchedEvent::Found(source) => PreparedEvent {
            event: adapt(source, time_zones),
            time_zone: time_zones.standard_name(&source.start_time),
        },
        FetchedEvent::Unavailable => PreparedEvent {
            event: default_event(me),
            time_zone: DEFAULT_TIME_ZONE.to_owned(),
        },
    }
}

pub mod driven_ports {
    use super::*;
    use crate::external_connections::ExternalConnectivity;

    /// Source of Inferno event descriptions
    pub trait EventSource {
        async fn fetch_event(
            &self,
            event_id: &str,
            inferno_api_key: &str,
            ext_cxn: &mut impl ExternalConnectivity,
        ) -> Result<InfernoEvent, anyhow::Error>;
    }
}

pub mod driving_ports {
    use super::*;
    use crate::domain::directory::driven_ports::{DelegatedTokenSource, DirectoryApi};
    use crate::domain::directory::{AuthorizationRequired, TokenAcquisitionError};
    use crate::external_connections::ExternalConnectivity;
    use thiserror::Error;

    #[derive(Debug, Error)]
    pub enum EventError {
        #[error(transparent)]
        AuthorizationRequired(#[from] AuthorizationRequired),
        #[error("the calendar provider did not acknowledge the created event")]
        CreationFailed,
        #[error(transparent)]
        PortError(#[from] anyhow::Error),
    }

    impl From<TokenAcquisitionError> for EventError {
        fn from(value: TokenAcquisitionError) -> Self {
            match value {
                TokenAcquisitionError::InteractionRequired(auth_err) => {
                    Self::AuthorizationRequired(auth_err)
                }
                TokenAcquisitionError::PortError(err) => {
                    Self::PortError(err.context("acquiring a token to write to the calendar"))
                }
            }
        }
    }


    pub trait CalendarPort {
        /// Creates a calendar event for the caller from the Inferno event with the given ID
        async fn create_event(
            &self,
            user_assertion: &str,
            inferno_api_key: &str,
            event_id: &str,
            ext_cxn: &mut impl ExternalConnectivity,
            token_source: &impl DelegatedTokenSource,
            directory: &impl DirectoryApi,
            event_source: &impl driven_ports::EventSource,
        ) -> Result<CalendarEvent, EventError>;
    }
}

pub struct CalendarService<TZ> {
    pub time_zones: TZ,
}

impl Default for CalendarService<StandardTimeZoneNames> {
    fn default() -> Self {
        CalendarService {
            time_zones: StandardTimeZoneNames::default(),
        }
    }
}

impl<TZ: TimeZoneResolver> driving_ports::CalendarPort for CalendarService<TZ> {
    async fn create_event(
        &self,
        user_assertion: &str,
        inferno_api_key: &str,
        event_id: &str,
        ext_cxn: &mut impl ExternalConnectivity,
        token_source: &impl DelegatedTokenSource,
        directory: &impl DirectoryApi,
        event_source: &impl EventSource,
    ) -> Result<CalendarEvent, EventError> {
        let token = token_source
            .acquire_delegated_token(user_assertion, CALENDAR_EVENT_SCOPES, &mut *ext_cxn)
            .await?;

        let me = directory
            .get_my_profile(&token, &mut *ext_cxn)
            .await
            .context("fetching the caller's profile")?;

        let fetched = fetch_event(event_id, inferno_api_key, &mut *ext_cxn, event_source).await;
        let prepared = prepare_event(&fetched, &me, &self.time_zones);

        let created = directory
            .create_event(&token, &prepared.event, &prepared.time_zone, &mut *ext_cxn)
            .await
            .context("creating a calendar event")?
            .ok_or(EventError::CreationFailed)?;
        info!(
            "Created calendar event {} for {}",
            created.id.as_deref().unwrap_or("<no id>"),
            me.user_principal_name
        );

        Ok(created)
    }
}
