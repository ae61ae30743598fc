//! The GTFS static schema.
//!
//! Identifiers pointing into `locations.geojson` (`stop_times.location_id`)
//! and the record ids of `translations` are declared as plain columns and are
//! not checked. `calendar_dates.service_id` is itself a defining column, so
//! it carries no foreign key.

use super::{EntityBuilder, Presence, SchemaGraph};
use crate::error::Result;

use Presence::{
    ConditionallyForbidden as CondForbidden, ConditionallyRequired as CondRequired, Optional,
    Recommended, Required,
};

/// Names of every entity in the GTFS schema.
pub const ENTITIES: [&str; 29] = [
    "agency",
    "areas",
    "attributions",
    "booking_rules",
    "calendar",
    "calendar_dates",
    "fare_attributes",
    "fare_leg_rules",
    "fare_media",
    "fare_products",
    "fare_rules",
    "fare_transfer_rules",
    "feed_info",
    "frequencies",
    "levels",
    "location_group_stops",
    "location_groups",
    "networks",
    "pathways",
    "route_networks",
    "routes",
    "shapes",
    "stop_areas",
    "stop_times",
    "stops",
    "timeframe",
    "transfers",
    "translations",
    "trips",
];

const SERVICE_IDS: [(&str, &str); 2] = [("calendar", "service_id"), ("calendar_dates", "service_id")];

/// Builds the GTFS schema graph.
pub fn schema() -> Result<SchemaGraph> {
    SchemaGraph::builder()
        .entity(
            EntityBuilder::new("agency", ["agency_id"])
                .column("agency_id", "Unique ID", CondRequired)
                .column("agency_name", "Text", Required)
                .column("agency_url", "URL", Required)
                .column("agency_timezone", "Timezone", Required)
                .column("agency_lang", "Language code", Optional)
                .column("agency_phone", "Phone number", Optional)
                .column("agency_fare_url", "URL", Optional)
                .column("agency_email", "Email", Optional),
        )
        .entity(
            EntityBuilder::new("stops", ["stop_id"])
                .column("stop_id", "Unique ID", Required)
                .column("stop_code", "Text", Optional)
                .column("stop_name", "Text", CondRequired)
                .column("tts_stop_name", "Text", Optional)
                .column("stop_desc", "Text", Optional)
                .column("stop_lat", "Latitude", CondRequired)
                .column("stop_lon", "Longitude", CondRequired)
                .column("zone_id", "ID", Optional)
                .column("stop_url", "URL", Optional)
                .column("location_type", "Enum", Optional)
                .references(
                    "parent_station",
                    "Foreign ID referencing stops.stop_id",
                    CondRequired,
                    ("stops", "stop_id"),
                )
                .column("stop_timezone", "Timezone", Optional)
                .column("wheelchair_boarding", "Enum", Optional)
                .references(
                    "level_id",
                    "Foreign ID referencing levels.level_id",
                    Optional,
                    ("levels", "level_id"),
                )
                .column("platform_code", "Text", Optional),
        )
        .entity(
            EntityBuilder::new("routes", ["route_id"])
                .column("route_id", "Unique ID", Required)
                .references(
                    "agency_id",
                    "Foreign ID referencing agency.agency_id",
                    CondRequired,
                    ("agency", "agency_id"),
                )
                .column("route_short_name", "Text", CondRequired)
                .column("route_long_name", "Text", CondRequired)
                .column("route_desc", "Text", Optional)
                .column("route_type", "Enum", Required)
                .column("route_url", "URL", Optional)
                .column("route_color", "Color", Optional)
                .column("route_text_color", "Color", Optional)
                .column("route_sort_order", "Non-negative integer", Optional)
                .column("continuous_pickup", "Enum", CondForbidden)
                .column("continuous_drop_off", "Enum", CondForbidden)
                .column("network_id", "ID", CondForbidden),
        )
        .entity(
            EntityBuilder::new("trips", ["trip_id"])
                .references(
                    "route_id",
                    "Foreign ID referencing routes.route_id",
                    Required,
                    ("routes", "route_id"),
                )
                .references_any_of(
                    "service_id",
                    "Foreign ID referencing calendar.service_id or calendar_dates.service_id",
                    Required,
                    SERVICE_IDS,
                )
                .column("trip_id", "Unique ID", Required)
                .column("trip_headsign", "Text", Optional)
                .column("trip_short_name", "Text", Optional)
                .column("direction_id", "Enum", Optional)
                .column("block_id", "ID", Optional)
                .references(
                    "shape_id",
                    "Foreign ID referencing shapes.shape_id",
                    CondRequired,
                    ("shapes", "shape_id"),
                )
                .column("wheelchair_accessible", "Enum", Optional)
                .column("bikes_allowed", "Enum", Optional),
        )
        .entity(
            EntityBuilder::new("stop_times", ["trip_id", "stop_sequence"])
                .references(
                    "trip_id",
                    "Foreign ID referencing trips.trip_id",
                    Required,
                    ("trips", "trip_id"),
                )
                .column("arrival_time", "Time", CondRequired)
                .column("departure_time", "Time", CondRequired)
                .references(
                    "stop_id",
                    "Foreign ID referencing stops.stop_id",
                    CondRequired,
                    ("stops", "stop_id"),
                )
                .references(
                    "location_group_id",
                    "Foreign ID referencing location_groups.location_group_id",
                    CondForbidden,
                    ("location_groups", "location_group_id"),
                )
                .column(
                    "location_id",
                    "Foreign ID referencing id from locations.geojson",
                    CondForbidden,
                )
                .column("stop_sequence", "Non-negative integer", Required)
                .column("stop_headsign", "Text", Optional)
                .column("start_pickup_drop_off_window", "Time", CondRequired)
                .column("end_pickup_drop_off_window", "Time", CondRequired)
                .column("pickup_type", "Enum", CondForbidden)
                .column("drop_off_type", "Enum", CondForbidden)
                .column("continuous_pickup", "Enum", CondForbidden)
                .column("continuous_drop_off", "Enum", CondForbidden)
                .column("shape_dist_traveled", "Non-negative float", Optional)
                .column("timepoint", "Enum", Recommended)
                .references(
                    "pickup_booking_rule_id",
                    "Foreign ID referencing booking_rules.booking_rule_id",
                    Optional,
                    ("booking_rules", "booking_rule_id"),
                )
                .references(
                    "drop_off_booking_rule_id",
                    "Foreign ID referencing booking_rules.booking_rule_id",
                    Optional,
                    ("booking_rules", "booking_rule_id"),
                ),
        )
        .entity(
            EntityBuilder::new("calendar", ["service_id"])
                .column("service_id", "Unique ID", Required)
                .column("monday", "Enum", Required)
                .column("tuesday", "Enum", Required)
                .column("wednesday", "Enum", Required)
                .column("thursday", "Enum", Required)
                .column("friday", "Enum", Required)
                .column("saturday", "Enum", Required)
                .column("sunday", "Enum", Required)
                .column("start_date", "Date", Required)
                .column("end_date", "Date", Required),
        )
        .entity(
            EntityBuilder::new("calendar_dates", ["service_id", "date"])
                .column(
                    "service_id",
                    "Foreign ID referencing calendar.service_id or ID",
                    Required,
                )
                .column("date", "Date", Required)
                .column("exception_type", "Enum", Required),
        )
        .entity(
            EntityBuilder::new("fare_attributes", ["fare_id"])
                .column("fare_id", "Unique ID", Required)
                .column("price", "Non-negative float", Required)
                .column("currency_type", "Currency code", Required)
                .column("payment_method", "Enum", Required)
                .column("transfers", "Enum", Required)
                .references(
                    "agency_id",
                    "Foreign ID referencing agency.agency_id",
                    CondRequired,
                    ("agency", "agency_id"),
                )
                .column("transfer_duration", "Non-negative integer", Optional),
        )
        .entity(
            EntityBuilder::new(
                "fare_rules",
                ["fare_id", "route_id", "origin_id", "destination_id", "contains_id"],
            )
            .references(
                "fare_id",
                "Foreign ID referencing fare_attributes.fare_id",
                Required,
                ("fare_attributes", "fare_id"),
            )
            .references(
                "route_id",
                "Foreign ID referencing routes.route_id",
                Optional,
                ("routes", "route_id"),
            )
            .references(
                "origin_id",
                "Foreign ID referencing stops.zone_id",
                Optional,
                ("stops", "zone_id"),
            )
            .references(
                "destination_id",
                "Foreign ID referencing stops.zone_id",
                Optional,
                ("stops", "zone_id"),
            )
            .references(
                "contains_id",
                "Foreign ID referencing stops.zone_id",
                Optional,
                ("stops", "zone_id"),
            ),
        )
        .entity(
            EntityBuilder::new(
                "timeframe",
                ["timeframe_group_id", "start_time", "end_time", "service_id"],
            )
            .column("timeframe_group_id", "ID", Required)
            .column("start_time", "Time", CondRequired)
            .column("end_time", "Time", CondRequired)
            .references_any_of(
                "service_id",
                "Foreign ID referencing calendar.service_id or calendar_dates.service_id",
                Required,
                SERVICE_IDS,
            ),
        )
        .entity(
            EntityBuilder::new("fare_media", ["fare_media_id"])
                .column("fare_media_id", "Unique ID", Required)
                .column("fare_media_name", "Text", Optional)
                .column("fare_media_type", "Enum", Required),
        )
        .entity(
            EntityBuilder::new("fare_products", ["fare_product_id", "fare_media_id"])
                .column("fare_product_id", "ID", Required)
                .column("fare_product_name", "Text", Optional)
                .references(
                    "fare_media_id",
                    "Foreign ID referencing fare_media.fare_media_id",
                    Optional,
                    ("fare_media", "fare_media_id"),
                )
                .column("amount", "Currency amount", Required)
                .column("currency", "Currency code", Required),
        )
        .entity(
            EntityBuilder::new(
                "fare_leg_rules",
                [
                    "network_id",
                    "from_area_id",
                    "to_area_id",
                    "from_timeframe_group_id",
                    "to_timeframe_group_id",
                    "fare_product_id",
                ],
            )
            .column("leg_group_id", "ID", Optional)
            .references_any_of(
                "network_id",
                "Foreign ID referencing routes.network_id or networks.network_id",
                Optional,
                [("routes", "network_id"), ("networks", "network_id")],
            )
            .references(
                "from_area_id",
                "Foreign ID referencing areas.area_id",
                Optional,
                ("areas", "area_id"),
            )
            .references(
                "to_area_id",
                "Foreign ID referencing areas.area_id",
                Optional,
                ("areas", "area_id"),
            )
            .references(
                "from_timeframe_group_id",
                "Foreign ID referencing timeframes.timeframe_group_id",
                Optional,
                ("timeframe", "timeframe_group_id"),
            )
            .references(
                "to_timeframe_group_id",
                "Foreign ID referencing timeframes.timeframe_group_id",
                Optional,
                ("timeframe", "timeframe_group_id"),
            )
            .references(
                "fare_product_id",
                "Foreign ID referencing fare_products.fare_product_id",
                Required,
                ("fare_products", "fare_product_id"),
            )
            .column("rule_priority", "Non-negative integer", Optional),
        )
        .entity(
            EntityBuilder::new(
                "fare_transfer_rules",
                [
                    "from_leg_group_id",
                    "to_leg_group_id",
                    "fare_product_id",
                    "transfer_count",
                    "duration_limit",
                ],
            )
            .references(
                "from_leg_group_id",
                "Foreign ID referencing fare_leg_rules.leg_group_id",
                Optional,
                ("fare_leg_rules", "leg_group_id"),
            )
            .references(
                "to_leg_group_id",
                "Foreign ID referencing fare_leg_rules.leg_group_id",
                Optional,
                ("fare_leg_rules", "leg_group_id"),
            )
            .column("transfer_count", "Non-zero integer", CondForbidden)
            .column("duration_limit", "Positive integer", Optional)
            .column("duration_limit_type", "Enum", CondRequired)
            .column("fare_transfer_type", "Enum", Required)
            .references(
                "fare_product_id",
                "Foreign ID referencing fare_products.fare_product_id",
                Optional,
                ("fare_products", "fare_product_id"),
            ),
        )
        .entity(
            EntityBuilder::new("areas", ["area_id"])
                .column("area_id", "Unique ID", Required)
                .column("area_name", "Text", Optional),
        )
        .entity(
            EntityBuilder::new("stop_areas", ["area_id", "stop_id"])
                .references(
                    "area_id",
                    "Foreign ID referencing areas.area_id",
                    Required,
                    ("areas", "area_id"),
                )
                .references(
                    "stop_id",
                    "Foreign ID referencing stops.stop_id",
                    Required,
                    ("stops", "stop_id"),
                ),
        )
        .entity(
            EntityBuilder::new("networks", ["network_id"])
                .column("network_id", "Unique ID", Required)
                .column("network_name", "Text", Optional),
        )
        .entity(
            EntityBuilder::new("route_networks", ["route_id"])
                .references(
                    "network_id",
                    "Foreign ID referencing networks.network_id",
                    Required,
                    ("networks", "network_id"),
                )
                .references(
                    "route_id",
                    "Foreign ID referencing routes.route_id",
                    Required,
                    ("routes", "route_id"),
                ),
        )
        .entity(
            EntityBuilder::new("shapes", ["shape_id", "shape_pt_sequence"])
                .column("shape_id", "ID", Required)
                .column("shape_pt_lat", "Latitude", Required)
                .column("shape_pt_lon", "Longitude", Required)
                .column("shape_pt_sequence", "Non-negative integer", Required)
                .column("shape_dist_traveled", "Non-negative float", Optional),
        )
        .entity(
            EntityBuilder::new("frequencies", ["trip_id", "start_time"])
                .references(
                    "trip_id",
                    "Foreign ID referencing trips.trip_id",
                    Required,
                    ("trips", "trip_id"),
                )
                .column("start_time", "Time", Required)
                .column("end_time", "Time", Required)
                .column("headway_secs", "Positive integer", Required)
                .column("exact_times", "Enum", Optional),
        )
        .entity(
            EntityBuilder::new(
                "transfers",
                [
                    "from_stop_id",
                    "to_stop_id",
                    "from_trip_id",
                    "to_trip_id",
                    "from_route_id",
                    "to_route_id",
                ],
            )
            .references(
                "from_stop_id",
                "Foreign ID referencing stops.stop_id",
                CondRequired,
                ("stops", "stop_id"),
            )
            .references(
                "to_stop_id",
                "Foreign ID referencing stops.stop_id",
                CondRequired,
                ("stops", "stop_id"),
            )
            .references(
                "from_route_id",
                "Foreign ID referencing routes.route_id",
                Optional,
                ("routes", "route_id"),
            )
            .references(
                "to_route_id",
                "Foreign ID referencing routes.route_id",
                Optional,
                ("routes", "route_id"),
            )
            .references(
                "from_trip_id",
                "Foreign ID referencing trips.trip_id",
                CondRequired,
                ("trips", "trip_id"),
            )
            .references(
                "to_trip_id",
                "Foreign ID referencing trips.trip_id",
                CondRequired,
                ("trips", "trip_id"),
            )
            .column("transfer_type", "Enum", Required)
            .column("min_transfer_time", "Non-negative integer", Optional),
        )
        .entity(
            EntityBuilder::new("pathways", ["pathway_id"])
                .column("pathway_id", "Unique ID", Required)
                .references(
                    "from_stop_id",
                    "Foreign ID referencing stops.stop_id",
                    Required,
                    ("stops", "stop_id"),
                )
                .references(
                    "to_stop_id",
                    "Foreign ID referencing stops.stop_id",
                    Required,
                    ("stops", "stop_id"),
                )
                .column("pathway_mode", "Enum", Required)
                .column("is_bidirectional", "Enum", Required)
                .column("length", "Non-negative float", Optional)
                .column("traversal_time", "Positive integer", Optional)
                .column("stair_count", "Non-null integer", Optional)
                .column("max_slope", "Float", Optional)
                .column("min_width", "Positive float", Optional)
                .column("signposted_as", "Text", Optional)
                .column("reversed_signposted_as", "Text", Optional),
        )
        .entity(
            EntityBuilder::new("levels", ["level_id"])
                .column("level_id", "Unique ID", Required)
                .column("level_index", "Float", Required)
                .column("level_name", "Text", Optional),
        )
        .entity(
            EntityBuilder::new("location_groups", ["location_group_id"])
                .column("location_group_id", "Unique ID", Required)
                .column("location_group_name", "Text", Optional),
        )
        .entity(
            EntityBuilder::new("location_group_stops", ["location_group_id", "stop_id"])
                .references(
                    "location_group_id",
                    "Foreign ID referencing location_groups.location_group_id",
                    Required,
                    ("location_groups", "location_group_id"),
                )
                .references(
                    "stop_id",
                    "Foreign ID referencing stops.stop_id",
                    Required,
                    ("stops", "stop_id"),
                ),
        )
        .entity(
            EntityBuilder::new("booking_rules", ["booking_rule_id"])
                .column("booking_rule_id", "Unique ID", Required)
                .column("booking_type", "Enum", Required)
                .column("prior_notice_duration_min", "Integer", CondRequired)
                .column("prior_notice_duration_max", "Integer", CondForbidden)
                .column("prior_notice_last_day", "Integer", CondRequired)
                .column("prior_notice_last_time", "Time", CondRequired)
                .column("prior_notice_start_day", "Integer", CondForbidden)
                .column("prior_notice_start_time", "Time", CondRequired)
                .references(
                    "prior_notice_service_id",
                    "Foreign ID referencing calendar.service_id",
                    CondForbidden,
                    ("calendar", "service_id"),
                )
                .column("message", "Text", Optional)
                .column("pickup_message", "Text", Optional)
                .column("drop_off_message", "Text", Optional)
                .column("phone_number", "Phone number", Optional)
                .column("info_url", "URL", Optional)
                .column("booking_url", "URL", Optional),
        )
        .entity(
            EntityBuilder::new(
                "translations",
                [
                    "table_name",
                    "field_name",
                    "language",
                    "record_id",
                    "record_sub_id",
                    "field_value",
                ],
            )
            .column("table_name", "Enum", Required)
            .column("field_name", "Text", Required)
            .column("language", "Language code", Required)
            .column("translation", "Text or URL or Email or Phone number", Required)
            .column("record_id", "Foreign ID", CondRequired)
            .column("record_sub_id", "Foreign ID", CondRequired)
            .column("field_value", "Text or URL or Email or Phone number", CondRequired),
        )
        .entity(
            EntityBuilder::new("feed_info", Vec::<String>::new())
                .column("feed_publisher_name", "Text", Required)
                .column("feed_publisher_url", "URL", Required)
                .column("feed_lang", "Language code", Required)
                .column("default_lang", "Language code", Optional)
                .column("feed_start_date", "Date", Recommended)
                .column("feed_end_date", "Date", Recommended)
                .column("feed_version", "Text", Recommended)
                .column("feed_contact_email", "Email", Optional)
                .column("feed_contact_url", "URL", Optional),
        )
        .entity(
            EntityBuilder::new("attributions", ["attribution_id"])
                .column("attribution_id", "Unique ID", Optional)
                .references(
                    "agency_id",
                    "Foreign ID referencing agency.agency_id",
                    Optional,
                    ("agency", "agency_id"),
                )
                .references(
                    "route_id",
                    "Foreign ID referencing routes.route_id",
                    Optional,
                    ("routes", "route_id"),
                )
                .references(
                    "trip_id",
                    "Foreign ID referencing trips.trip_id",
                    Optional,
                    ("trips", "trip_id"),
                )
                .column("organization_name", "Text", Required)
                .column("is_producer", "Enum", Optional)
                .column("is_operator", "Enum", Optional)
                .column("is_authority", "Enum", Optional)
                .column("attribution_url", "URL", Optional)
                .column("attribution_email", "Email", Optional)
                .column("attribution_phone", "Phone number", Optional),
        )
        .build()
}
