use super::*;
use std::str::FromStr;
use uuid::Uuid;

#[test]
fn test_new_ids_are_time_ordered() {
    let first = SeatPlanChangeId::new();
    let second = SeatPlanChangeId::new();
    assert_ne!(first, second);
    assert_eq!(first.into_inner().get_version_num(), 7);
}

#[test]
fn test_uuid_round_trip_through_from() {
    let uuid = Uuid::new_v4();
    let org: OrganizationId = uuid.into();
    let back: Uuid = org.into();
    assert_eq!(back, uuid);
    assert_eq!(OrganizationId::from_uuid(uuid), org);
}

#[test]
fn test_display_matches_inner_uuid() {
    let uuid = Uuid::new_v4();
    assert_eq!(UserId::from_uuid(uuid).to_string(), uuid.to_string());
}

#[test]
fn test_from_str_rejects_garbage() {
    assert!(OrganizationId::from_str("not-a-uuid").is_err());
    let uuid = Uuid::new_v4();
    assert_eq!(
        OrganizationId::from_str(&uuid.to_string()).unwrap().into_inner(),
        uuid
    );
}

#[test]
fn test_serializes_transparently() {
    let uuid = Uuid::new_v4();
    let json = serde_json::to_string(&UserId::from_uuid(uuid)).unwrap();
    assert_eq!(json, format!("\"{uuid}\""));
}
