//! End-to-end scenarios against the `StorageFacade` directly (no HTTP),
//! covering the testable properties and worked examples.

use nimbus_commission::CommissionCoordinatorApi;
use nimbus_policy::{PolicyPatch, VersioningMode};
use nimbus_quotaholder::QuotaholderApi;
use nimbus_storage::{PutObjectOutcome, PutObjectRequest, RequestContext};
use nimbus_types::Principal;
use nimbus_tests::{build_state, build_state_with, store_as_blocks};

fn ctx(account: &str) -> RequestContext {
    RequestContext { user: Principal::new(account), account: account.to_string() }
}

fn put_request(size: u64) -> PutObjectRequest {
    PutObjectRequest {
        size,
        content_type: "application/octet-stream".to_string(),
        checksum: String::new(),
        domain: "user".to_string(),
        meta: Vec::new(),
        replace_meta: false,
        permissions: None,
    }
}

#[test]
fn upload_and_overwrite_under_versioning_none() {
    let state = build_state();
    let ctx = ctx("alice");
    state
        .facade
        .put_container(&ctx, "pics", None, Some(VersioningMode::None), None, 0)
        .unwrap();

    let data = vec![7u8; 100];
    let hashmap = store_as_blocks(&state.blocks, &data, state.config.block_size);
    let outcome = state
        .facade
        .update_object_hashmap(&ctx, "pics", "cat.png", put_request(data.len() as u64), hashmap.clone(), 1)
        .unwrap();
    let first_serial = match outcome {
        PutObjectOutcome::Created { version_serial, .. } => version_serial,
        PutObjectOutcome::MissingBlocks(missing) => panic!("unexpected missing blocks: {missing:?}"),
    };

    let after_first = state.facade.account_stats(&ctx, 1).unwrap();
    assert_eq!(after_first.bytes, 100);

    let bigger = vec![9u8; 250];
    let hashmap2 = store_as_blocks(&state.blocks, &bigger, state.config.block_size);
    let outcome2 = state
        .facade
        .update_object_hashmap(&ctx, "pics", "cat.png", put_request(bigger.len() as u64), hashmap2, 2)
        .unwrap();
    let second_serial = match outcome2 {
        PutObjectOutcome::Created { version_serial, .. } => version_serial,
        PutObjectOutcome::MissingBlocks(missing) => panic!("unexpected missing blocks: {missing:?}"),
    };
    assert_ne!(first_serial, second_serial);

    // versioning=none drops the prior NORMAL version immediately, so the
    // account's byte usage reflects only the newest content, not the sum.
    let after_second = state.facade.account_stats(&ctx, 2).unwrap();
    assert_eq!(after_second.bytes, 250);

    let fetched = state.facade.get_object_version(&ctx, "pics", "cat.png", 2).unwrap();
    assert_eq!(fetched.size, 250);
    assert_eq!(fetched.serial, second_serial);
}

#[test]
fn quota_rejected_upload_leaves_no_version_and_no_pending_commission() {
    let state = build_state_with(|c| c.default_container_quota = 0);
    let ctx = ctx("bob");
    state
        .facade
        .put_container(&ctx, "docs", Some(1024), None, None, 0)
        .unwrap();

    let data = vec![1u8; 2048];
    let hashmap = store_as_blocks(&state.blocks, &data, state.config.block_size);
    let request = put_request(data.len() as u64);

    let err = state
        .facade
        .update_object_hashmap(&ctx, "docs", "report.pdf", request, hashmap, 1)
        .unwrap_err();

    match err {
        nimbus_types::CoreError::QuotaExceeded { context } => {
            assert_eq!(context.limit, 1024);
            assert_eq!(context.usage, 0);
            assert_eq!(context.requested, 2048);
        }
        other => panic!("expected QuotaExceeded, got {other:?}"),
    }

    assert!(state.facade.get_object_version(&ctx, "docs", "report.pdf", 1).is_err());
    let report = state.commissions.reconcile("nimbus-storage", 2).unwrap();
    assert!(report.accepted.is_empty());
    assert!(report.rejected.is_empty());
}

#[test]
fn missing_blocks_are_reported_before_any_version_is_created() {
    let state = build_state();
    let ctx = ctx("carol");
    state.facade.put_container(&ctx, "stuff", None, None, None, 0).unwrap();

    let mut hashmap = nimbus_block_store::Hashmap::new();
    hashmap.push([0xAB; 32]); // never uploaded
    let outcome = state
        .facade
        .update_object_hashmap(&ctx, "stuff", "thing.bin", put_request(64), hashmap, 1)
        .unwrap();

    match outcome {
        PutObjectOutcome::MissingBlocks(missing) => assert_eq!(missing, vec![[0xAB; 32]]),
        PutObjectOutcome::Created { .. } => panic!("expected missing blocks"),
    }
    assert!(state.facade.get_object_version(&ctx, "stuff", "thing.bin", 1).is_err());
}

#[test]
fn copy_object_shares_root_hash_but_doubles_accounted_usage() {
    let state = build_state();
    let ctx = ctx("dave");
    state.facade.put_container(&ctx, "bucket", None, None, None, 0).unwrap();

    let data = vec![3u8; 500];
    let hashmap = store_as_blocks(&state.blocks, &data, state.config.block_size);
    state
        .facade
        .update_object_hashmap(&ctx, "bucket", "orig.bin", put_request(data.len() as u64), hashmap, 1)
        .unwrap();

    let before_copy = state.facade.account_stats(&ctx, 1).unwrap();
    assert_eq!(before_copy.bytes, 500);

    let (_, root_hash) = state
        .facade
        .copy_object(&ctx, "bucket", "orig.bin", "bucket", "copy.bin", 2)
        .unwrap();

    let original = state.facade.get_object_version(&ctx, "bucket", "orig.bin", 2).unwrap();
    assert_eq!(original.hash, Some(root_hash));

    let after_copy = state.facade.account_stats(&ctx, 2).unwrap();
    assert_eq!(after_copy.bytes, 1000);
}

#[test]
fn zero_byte_object_still_creates_a_version_with_empty_block_hash() {
    let state = build_state();
    let ctx = ctx("erin");
    state.facade.put_container(&ctx, "empties", None, None, None, 0).unwrap();

    let hashmap = store_as_blocks(&state.blocks, &[], state.config.block_size);
    let outcome = state
        .facade
        .update_object_hashmap(&ctx, "empties", "nothing", put_request(0), hashmap, 1)
        .unwrap();
    assert!(matches!(outcome, PutObjectOutcome::Created { .. }));

    let version = state.facade.get_object_version(&ctx, "empties", "nothing", 1).unwrap();
    assert_eq!(version.size, 0);
}

#[test]
fn delete_on_never_written_object_is_not_found() {
    let state = build_state();
    let ctx = ctx("frank");
    state.facade.put_container(&ctx, "c", None, None, None, 0).unwrap();
    let err = state.facade.delete_object(&ctx, "c", "ghost", 1).unwrap_err();
    assert!(matches!(err, nimbus_types::CoreError::NotFound(_)));
}

#[test]
fn container_project_reassignment_moves_usage_between_holdings() {
    let state = build_state();
    let ctx = ctx("grace");
    state.facade.put_container(&ctx, "media", None, None, None, 0).unwrap();

    let data = vec![5u8; 300];
    let hashmap = store_as_blocks(&state.blocks, &data, state.config.block_size);
    state
        .facade
        .update_object_hashmap(&ctx, "media", "clip.mp4", put_request(data.len() as u64), hashmap, 1)
        .unwrap();

    let patch = PolicyPatch { quota: None, versioning: None, project: Some("shared-project".to_string()) };
    let updated = state.facade.update_container_policy(&ctx, "media", patch, false, 2).unwrap();
    assert_eq!(updated.project, "shared-project");

    let holdings = state
        .quotaholder
        .get_quota(Some(&["grace".to_string()]), Some(&["shared-project".to_string()]), None)
        .unwrap();
    assert!(!holdings.is_empty());
}

#[test]
fn public_token_round_trips_to_the_bound_path() {
    let state = build_state();
    let ctx = ctx("heidi");
    state.facade.put_container(&ctx, "share", None, None, None, 0).unwrap();
    let hashmap = store_as_blocks(&state.blocks, b"hello", state.config.block_size);
    state
        .facade
        .update_object_hashmap(&ctx, "share", "note.txt", put_request(5), hashmap, 1)
        .unwrap();

    let token = state
        .facade
        .update_object_public(&ctx, "share", "note.txt", true, 2)
        .unwrap()
        .expect("publicizing returns a token");

    let resolved = state.facade.resolve_public_token(&token).unwrap();
    assert_eq!(resolved.as_deref(), Some("heidi/share/note.txt"));

    state.facade.update_object_public(&ctx, "share", "note.txt", false, 3).unwrap();
    assert!(state.facade.resolve_public_token(&token).unwrap().is_none());
}

#[test]
fn overwrite_under_a_finite_container_quota_nets_the_superseded_size() {
    // §8 scenario 1: a 1000-byte container quota, overwriting a 600-byte
    // object with a 500-byte one, must succeed — the precheck has to net
    // out the object's own prior bytes rather than double-count them.
    let state = build_state();
    let ctx = ctx("ivan");
    state.facade.put_container(&ctx, "bin", Some(1000), None, None, 0).unwrap();

    let first = vec![1u8; 600];
    let hashmap = store_as_blocks(&state.blocks, &first, state.config.block_size);
    state
        .facade
        .update_object_hashmap(&ctx, "bin", "a.bin", put_request(first.len() as u64), hashmap, 1)
        .unwrap();

    let second = vec![2u8; 500];
    let hashmap2 = store_as_blocks(&state.blocks, &second, state.config.block_size);
    state
        .facade
        .update_object_hashmap(&ctx, "bin", "a.bin", put_request(second.len() as u64), hashmap2, 2)
        .unwrap();

    let fetched = state.facade.get_object_version(&ctx, "bin", "a.bin", 2).unwrap();
    assert_eq!(fetched.size, 500);
}

#[test]
fn default_versioning_retains_history_bytes_as_usage_until_purged() {
    // Default config: versioning=auto, free_versioning=false. Overwriting
    // (and deleting) must NOT refund the superseded bytes immediately —
    // they stay billed until an explicit history purge.
    let state = build_state();
    let ctx = ctx("judy");
    state.facade.put_container(&ctx, "docs", None, None, None, 0).unwrap();

    let first = vec![1u8; 300];
    let hashmap = store_as_blocks(&state.blocks, &first, state.config.block_size);
    state
        .facade
        .update_object_hashmap(&ctx, "docs", "a.txt", put_request(first.len() as u64), hashmap, 1)
        .unwrap();

    let second = vec![2u8; 200];
    let hashmap2 = store_as_blocks(&state.blocks, &second, state.config.block_size);
    state
        .facade
        .update_object_hashmap(&ctx, "docs", "a.txt", put_request(second.len() as u64), hashmap2, 2)
        .unwrap();

    // Both the old (retained HISTORY) and new bytes are still counted.
    let after_overwrite = state.facade.account_stats(&ctx, 2).unwrap();
    assert_eq!(after_overwrite.bytes, 500);

    state.facade.delete_object(&ctx, "docs", "a.txt", 3).unwrap();
    let after_delete = state.facade.account_stats(&ctx, 3).unwrap();
    assert_eq!(after_delete.bytes, 500);

    state.facade.delete_container(&ctx, "docs", Some(i64::MAX), None, 4).unwrap();
    let after_purge = state.facade.account_stats(&ctx, 4).unwrap();
    assert_eq!(after_purge.bytes, 0);
}

#[test]
fn free_versioning_nets_history_bytes_immediately() {
    // With free_versioning=true, HISTORY is never counted as usage in the
    // first place — no billed delta survives an overwrite, and a later
    // purge has nothing left to refund.
    let state = build_state_with(|c| c.free_versioning = true);
    let ctx = ctx("karl");
    state.facade.put_container(&ctx, "docs", None, None, None, 0).unwrap();

    let first = vec![1u8; 300];
    let hashmap = store_as_blocks(&state.blocks, &first, state.config.block_size);
    state
        .facade
        .update_object_hashmap(&ctx, "docs", "a.txt", put_request(first.len() as u64), hashmap, 1)
        .unwrap();

    let second = vec![2u8; 200];
    let hashmap2 = store_as_blocks(&state.blocks, &second, state.config.block_size);
    state
        .facade
        .update_object_hashmap(&ctx, "docs", "a.txt", put_request(second.len() as u64), hashmap2, 2)
        .unwrap();

    let after_overwrite = state.facade.account_stats(&ctx, 2).unwrap();
    assert_eq!(after_overwrite.bytes, 200);
}
