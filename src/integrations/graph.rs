use crate::domain::calendar::{
    Attendee, AttendeeType, BodyType, CalendarEvent, DateTimeTimeZone, EmailAddress, ItemBody,
};
use crate::domain::directory::driven_ports::DirectoryApi;
use crate::domain::directory::{AccessToken, DirectoryUser, UserProfile};
use crate::external_connections::ExternalConnectivity;
use anyhow::{Context, bail};
use reqwest::header::{CONTENT_TYPE, HeaderValue};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Header asking the calendar provider to interpret and report event times in a named zone
const PREFER: &str = "Prefer";

/// Directory and calendar adapter for Microsoft Graph
pub struct GraphDirectory {
    pub base_url: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct GraphProfile {
    user_principal_name: String,
    display_name: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct GraphListedUser {
    id: String,
    user_principal_name: String,
}

#[derive(Deserialize)]
struct GraphPage<T> {
    value: Vec<T>,
    #[serde(rename = "@odata.nextLink")]
    next_link: Option<String>,
}

#[derive(Serialize, Deserialize, Clone, Copy)]
#[serde(rename_all = "lowercase")]
enum GraphBodyType {
    Text,
    Html,
}

#[derive(Serialize, Deserialize, Clone, Copy)]
#[serde(rename_all = "lowercase")]
enum GraphAttendeeType {
    Required,
    Optional,
    Resource,
}

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GraphItemBody {
    content_type: GraphBodyType,
    content: String,
}

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GraphDateTimeTimeZone {
    date_time: String,
    time_zone: String,
}

#[derive(Serialize, Deserialize)]
struct GraphEmailAddress {
    #[serde(default)]
    address: String,
    #[serde(default)]
    name: String,
}

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GraphAttendee {
    email_address: GraphEmailAddress,
    #[serde(rename = "type")]
    attendee_type: GraphAttendeeType,
}

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GraphEvent {
    #[serde(skip_serializing_if = "Option::is_none")]
    id: Option<String>,
    #[serde(default)]
    subject: String,
    body: GraphItemBody,
    start: GraphDateTimeTimeZone,
    end: GraphDateTimeTimeZone,
    #[serde(default)]
    attendees: Vec<GraphAttendee>,
    #[serde(skip_serializing_if = "Option::is_none")]
    web_link: Option<String>,
}

impl From<BodyType> for GraphBodyType {
    fn from(value: BodyType) -> Self {
        match value {
            BodyType::Text => Self::Text,
            BodyType::Html => Self::Html,
        }
    }
}

impl From<GraphBodyType> for BodyType {
    fn from(value: GraphBodyType) -> Self {
        match value {
            GraphBodyType::Text => Self::Text,
            GraphBodyType::Html => Self::Html,
        }
    }
}

impl From<AttendeeType> for GraphAttendeeType {
    fn from(value: AttendeeType) -> Self {
        match value {
            AttendeeType::Required => Self::Required,
            AttendeeType::Optional => Self::Optional,
            AttendeeType::Resource => Self::Resource,
        }
    }
}

impl From<GraphAttendeeType> for AttendeeType {
    fn from(value: GraphAttendeeType) -> Self {
        match value {
            GraphAttendeeType::Required => Self::Required,
            GraphAttendeeType::Optional => Self::Optional,
            GraphAttendeeType::Resource => Self::Resource,
        }
    }
}

impl From<&DateTimeTimeZone> for GraphDateTimeTimeZone {
    fn from(value: &DateTimeTimeZone) -> Self {
        GraphDateTimeTimeZone {
            date_time: value.date_time.clone(),
            time_zone: value.time_zone.clone(),
        }
    }
}

impl From<GraphDateTimeTimeZone> for DateTimeTimeZone {
    fn from(value: GraphDateTimeTimeZone) -> Self {
        DateTimeTimeZone {
            date_time: value.date_time,
            time_zone: value.time_zone,
        }
    }
}

impl From<&CalendarEvent> for GraphEvent {
    fn from(value: &CalendarEvent) -> Self {
        GraphEvent {
            id: value.id.clone(),
            subject: value.subject.clone(),
            body: GraphItemBody {
                content_type: value.body.content_type.into(),
                content: value.body.content.clone(),
            },
            start: (&value.start).into(),
            end: (&value.end).into(),
            attendees: value
                .attendees
                .iter()
                .map(|attendee| GraphAttendee {
                    email_address: GraphEmailAddress {
                        address: attendee.email_address.address.clone(),
                        name: attendee.email_address.name.clone(),
                    },
                    attendee_type: attendee.attendee_type.into(),
                })
                .collect(),
            web_link: value.web_link.clone(),
        }
    }
}

impl From<GraphEvent> for CalendarEvent {
    fn from(value: GraphEvent) -> Self {
        CalendarEvent {
            id: value.id,
            subject: value.subject,
            body: ItemBody {
                content_type: value.body.content_type.into(),
                content: value.body.content,
            },
            start: value.start.into(),
            end: value.end.into(),
            attendees: value
                .attendees
                .into_iter()
                .map(|attendee| Attendee {
                    email_address: EmailAddress {
                        address: attendee.email_address.address,
                        name: attendee.email_address.name,
                    },
                    attendee_type: attendee.attendee_type.into(),
                })
                .collect(),
            web_link: value.web_link,
        }
    }
}

impl GraphDirectory {
    async fn get_json<T: DeserializeOwned>(
        &self,
        url: url::Url,
        token: &AccessToken,
        ext_cxn: &impl ExternalConnectivity,
    ) -> Result<T, anyhow::Error> {
        let response = ext_cxn
            .http_client()
            .get(url.clone())
            .bearer_auth(token.secret())
            .send()
            .await
            .with_context(|| format!("requesting {}", url.path()))?;
        if !response.status().is_success() {
            bail!(
                "Graph rejected a request to {}: {}",
                url.path(),
                super::failure_detail(response).await
            );
        }

        let body = response
            .bytes()
            .await
            .with_context(|| format!("reading the response from {}", url.path()))?;
        serde_json::from_slice(&body).with_context(|| format!("parsing the response from {}", url.path()))
    }
}

impl DirectoryApi for GraphDirectory {
    async fn get_my_profile(
        &self,
        token: &AccessToken,
        ext_cxn: &mut impl ExternalConnectivity,
    ) -> Result<UserProfile, anyhow::Error> {
        let url = super::endpoint(&self.base_url, &["me"])?;
        let profile: GraphProfile = self.get_json(url, token, &*ext_cxn).await?;

        Ok(UserProfile {
            user_principal_name: profile.user_principal_name,
            display_name: profile.display_name.unwrap_or_default(),
        })
    }

    async fn list_enabled_users(
        &self,
        token: &AccessToken,
        ext_cxn: &mut impl ExternalConnectivity,
    ) -> Result<Vec<DirectoryUser>, anyhow::Error> {
        let mut url = super::endpoint(&self.base_url, &["users"])?;
        url.query_pairs_mut()
            .append_pair("$filter", "accountEnabled eq true")
            .append_pair("$select", "id,userPrincipalName");

        let mut users = Vec::new();
        let mut next_page = Some(url);
        while let Some(page_url) = next_page.take() {
            let page: GraphPage<GraphListedUser> = self.get_json(page_url, token, &*ext_cxn).await?;
            users.extend(page.value.into_iter().map(|user| DirectoryUser {
                id: user.id,
                user_principal_name: user.user_principal_name,
            }));

            next_page = page
                .next_link
                .map(|link| url::Url::parse(&link))
                .transpose()
                .context("following the next page of directory users")?;
        }
        debug!("Directory listed {} enabled users", users.len());

        Ok(users)
    }

    async fn create_event(
        &self,
        token: &AccessToken,
        event: &CalendarEvent,
        time_zone_preference: &str,
        ext_cxn: &mut impl ExternalConnectivity,
    ) -> Result<Option<CalendarEvent>, anyhow::Error> {
        let url = super::endpoint(&self.base_url, &["me", "events"])?;
        let payload = serde_json::to_vec(&GraphEvent::from(event))
            .context("serializing the calendar event")?;
        let preference = HeaderValue::from_str(&format!("outlook.timezone=\"{time_zone_preference}\""))
            .context("building the time zone preference header")?;

        let response = ext_cxn
            .http_client()
            .post(url)
            .bearer_auth(token.secret())
            .header(CONTENT_TYPE, HeaderValue::from_static("application/json"))
            .header(PREFER, preference)
            .body(payload)
            .send()
            .await
            .context("submitting a calendar event")?;
        if !response.status().is_success() {
            bail!(
                "Graph refused to create the calendar event: {}",
                super::failure_detail(response).await
            );
        }

        let body = response
            .bytes()
            .await
            .context("reading the created calendar event")?;
        if body.iter().all(u8::is_ascii_whitespace) {
            return Ok(None);
        }

        let created: Option<GraphEvent> =
            serde_json::from_slice(&body).context("parsing the created calendar event")?;
        Ok(created.map(CalendarEvent::from))
    }
}
