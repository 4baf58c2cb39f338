use crate::domain;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// DTO for a calendar event, shaped like the calendar provider's own event resource
#[derive(Serialize, Deserialize, ToSchema, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct CalendarEvent {
    #[serde(skip_serializing_if = "Option::is_none")]
    #[schema(example = "AAMkAGI2TG93AAA=")]
    pub id: Option<String>,
    #[schema(example = "Standup")]
    pub subject: String,
    pub body: ItemBody,
    pub start: DateTimeTimeZone,
    pub end: DateTimeTimeZone,
    #[serde(default)]
    pub attendees: Vec<Attendee>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub web_link: Option<String>,
}

#[derive(Serialize, Deserialize, ToSchema, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ItemBody {
    pub content_type: BodyType,
    #[schema(example = "Standup\ndaily sync")]
    pub content: String,
}

#[derive(Serialize, Deserialize, ToSchema, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum BodyType {
    Text,
    Html,
}

#[derive(Serialize, Deserialize, ToSchema, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct DateTimeTimeZone {
    #[schema(example = "2024-01-10T09:00:00")]
    pub date_time: String,
    #[schema(example = "Pacific Standard Time")]
    pub time_zone: String,
}

#[derive(Serialize, Deserialize, ToSchema, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Attendee {
    pub email_address: EmailAddress,
    #[serde(rename = "type")]
    pub attendee_type: AttendeeType,
}

#[derive(Serialize, Deserialize, ToSchema, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum AttendeeType {
    Required,
    Optional,
    Resource,
}

#[derive(Serialize, Deserialize, ToSchema, Debug, Clone, PartialEq, Eq)]
pub struct EmailAddress {
    #[schema(example = "megan@contoso.com")]
    pub address: String,
    #[schema(example = "Megan Bowen")]
    pub name: String,
}

impl From<domain::calendar::CalendarEvent> for CalendarEvent {
    fn from(value: domain::calendar::CalendarEvent) -> Self {
        CalendarEvent {
            id: value.id,
            subject: value.subject,
            body: ItemBody {
                content_type: match value.body.content_type {
                    domain::calendar::BodyType::Text => BodyType::Text,
                    domain::calendar::BodyType::Html => BodyType::Html,
                },
                content: value.body.content,
            },
            start: value.start.into(),
            end: value.end.into(),
            attendees: value.attendees.into_iter().map(Attendee::from).collect(),
            web_link: value.web_link,
        }
    }
}

impl From<domain::calendar::DateTimeTimeZone> for DateTimeTimeZone {
    fn from(value: domain::calendar::DateTimeTimeZone) -> Self {
        DateTimeTimeZone {
            date_time: value.date_time,
            time_zone: value.time_zone,
        }
    }
}

impl From<domain::calendar::Attendee> for Attendee {
    fn from(value: domain::calendar::Attendee) -> Self {
        Attendee {
            email_address: EmailAddress {
                address: value.email_address.address,
                name: value.email_address.name,
            },
            attendee_type: match value.attendee_type {
                domain::calendar::AttendeeType::Required => AttendeeType::Required,
                domain::calendar::AttendeeType::Optional => AttendeeType::Optional,
                domain::calendar::AttendeeType::Resource => AttendeeType::Resource,
            },
        }
    }
}
