//! Request body schemas, per resource and microversion.

use failsafe_http::schema::{ObjectSchema, Schema, StringFormat};
use failsafe_model::{NotificationType, RecoveryMethod};

fn name() -> Schema {
    Schema::string()
        .min_length(1)
        .max_length(255)
        .format(StringFormat::Name)
        .into()
}

fn non_empty(max: usize) -> Schema {
    Schema::string().min_length(1).max_length(max).into()
}

fn description() -> Schema {
    Schema::nullable(Schema::string().max_length(255))
}

fn recovery_method() -> Schema {
    Schema::string()
        .one_of(RecoveryMethod::ALL.iter().map(RecoveryMethod::as_str))
        .into()
}

fn segment_properties(with_enabled: bool) -> ObjectSchema {
    let segment = Schema::object()
        .property("name", name())
        .property("description", description())
        .property("recovery_method", recovery_method())
        .property("service_type", non_empty(255));
    if with_enabled {
        segment.property("enabled", Schema::boolean())
    } else {
        segment
    }
}

/// `POST /v1/segments`; `enabled` is accepted from 1.2.
#[must_use]
pub fn create_segment(with_enabled: bool) -> Schema {
    Schema::object()
        .property(
            "segment",
            segment_properties(with_enabled).required(["name", "recovery_method", "service_type"]),
        )
        .required(["segment"])
        .into()
}

/// `PUT /v1/segments/{id}`: at least one attribute.
#[must_use]
pub fn update_segment(with_enabled: bool) -> Schema {
    let mut segment = segment_properties(with_enabled)
        .any_of_required(["name"])
        .any_of_required(["description"])
        .any_of_required(["recovery_method"])
        .any_of_required(["service_type"]);
    if with_enabled {
        segment = segment.any_of_required(["enabled"]);
    }
    Schema::object()
        .property("segment", segment)
        .required(["segment"])
        .into()
}

fn host_properties() -> ObjectSchema {
    Schema::object()
        .property("name", name())
        .property("type", non_empty(255))
        .property("control_attributes", Schema::string().min_length(1))
        .property("reserved", Schema::boolean())
        .property("on_maintenance", Schema::boolean())
}

/// `POST /v1/segments/{segment_id}/hosts`.
#[must_use]
pub fn create_host() -> Schema {
    Schema::object()
        .property(
            "host",
            host_properties().required(["name", "type", "control_attributes"]),
        )
        .required(["host"])
        .into()
}

/// `PUT /v1/segments/{segment_id}/hosts/{id}`: at least one attribute.
#[must_use]
pub fn update_host() -> Schema {
    Schema::object()
        .property(
            "host",
            host_properties()
                .any_of_required(["name"])
                .any_of_required(["type"])
                .any_of_required(["control_attributes"])
                .any_of_required(["reserved"])
                .any_of_required(["on_maintenance"]),
        )
        .required(["host"])
        .into()
}

/// `POST /v1/notifications`.
#[must_use]
pub fn create_notification() -> Schema {
    Schema::object()
        .property(
            "notification",
            Schema::object()
                .property(
                    "type",
                    Schema::string().one_of(NotificationType::ALL.iter().map(NotificationType::as_str)),
                )
                .property(
                    "hostname",
                    Schema::string()
                        .min_length(1)
                        .max_length(255)
                        .pattern("^[a-zA-Z0-9_.-]*$"),
                )
                .property(
                    "generated_time",
                    Schema::string().format(StringFormat::DateTime),
                )
                .property("payload", Schema::object().allow_additional())
                .required(["type", "hostname", "generated_time", "payload"]),
        )
        .required(["notification"])
        .into()
}

/// Body of the `enable`/`disable` segment actions: `{"<action>": null}`.
#[must_use]
pub fn segment_action(action: &str) -> Schema {
    Schema::object()
        .property(action, Schema::nullable(Schema::object()))
        .required([action])
        .into()
}
