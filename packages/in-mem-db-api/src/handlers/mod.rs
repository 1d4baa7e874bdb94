//! HTTP endpoint implementations for CRUD, DDL, and RPC.

mod crud_handlers;
mod ddl_handlers;
mod query_handlers;
mod request_utils;
mod response;
mod rpc_handlers;

// Re-export public items
pub use crud_handlers::{
    create_record, delete_record, partial_update_record, read_record, update_record,
};
pub use ddl_handlers::{
    add_field, create_relation, create_table, delete_relation, delete_table, remove_field,
};
pub use query_handlers::{list_tables, query_records};
pub use request_utils::{
    build_empty_response, build_response, map_db_error_to_router_error,
    read_request_body_with_timeout, wait_for_response_with_timeout, AddFieldRequest,
    AddFieldResponse, CreateRelationRequest, CreateRelationResponse, CreateTableRequest,
    CreateTableResponse, FieldDefinition, MatchitParams,
};
pub use response::{error_response, success_response, ApiError, ApiResponse, ErrorResponse};
pub use rpc_handlers::rpc;

// Re-export request types that are used in handlers
pub use request_utils::{
    CreateRecordRequest, CreateRecordResponse, PartialUpdateRequest, UpdateRecordRequest,
};
