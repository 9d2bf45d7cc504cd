//! The ABI announcement served once per connection.

/// JSON description of the wire protocol's structs and variants.
///
/// Pushed to every client as a single text frame immediately after the
/// transport handshake; all later frames in both directions are binary.
/// Clients use it to decode the tagged unions that follow.
pub const STATE_HISTORY_ABI: &str = r#"{
    "version": "scribe::state_history/1",
    "structs": [
        { "name": "get_status_request_v0", "fields": [] },
        { "name": "get_status_result_v0", "fields": [
            { "name": "last_irreversible_block_num", "type": "uint32" },
            { "name": "last_irreversible_block_id", "type": "checksum256" },
            { "name": "state_begin_block_num", "type": "uint32" },
            { "name": "state_end_block_num", "type": "uint32" }
        ] },
        { "name": "get_block_request_v0", "fields": [
            { "name": "block_num", "type": "uint32" }
        ] },
        { "name": "get_block_result_v0", "fields": [
            { "name": "block_num", "type": "uint32" },
            { "name": "block", "type": "bytes?" },
            { "name": "block_state", "type": "bytes?" },
            { "name": "traces", "type": "bytes?" },
            { "name": "deltas", "type": "bytes?" }
        ] },
        { "name": "row", "fields": [
            { "name": "present", "type": "bool" },
            { "name": "data", "type": "bytes" }
        ] },
        { "name": "table_delta_v0", "fields": [
            { "name": "name", "type": "string" },
            { "name": "rows", "type": "row[]" }
        ] }
    ],
    "variants": [
        { "name": "state_request", "types": [ "get_status_request_v0", "get_block_request_v0" ] },
        { "name": "state_result", "types": [ "get_status_result_v0", "get_block_result_v0" ] }
    ]
}"#;
