// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! File-transfer specs: tickets and windowed reads.

use mesh_wire::{ErrorCode, ReadMode, Request, Response};

use super::prelude::*;

#[tokio::test]
async fn ticket_minting_and_url_shape() {
    let node = TestNode::spawn().await;
    std::fs::write(node.shared_dir.path().join("test.txt"), "payload").unwrap();

    match node.call(Request::CreateDownloadTicket { path: "test.txt".into() }).await {
        Response::Ticket { token, expires_ms, http_url } => {
            assert_eq!(token.len(), 32);
            assert!(expires_ms > 0);
            assert!(http_url.contains(&token));
            assert!(http_url.starts_with("http://"));
        }
        other => panic!("unexpected response: {other:?}"),
    }
    node.daemon.shutdown().await;
}

#[tokio::test]
async fn traversal_paths_are_rejected() {
    let node = TestNode::spawn().await;
    for path in ["../etc/passwd", "/etc/passwd", "a/../../b"] {
        match node.call(Request::CreateDownloadTicket { path: path.into() }).await {
            Response::Error { code, .. } => assert_eq!(code, ErrorCode::DisallowedPath),
            other => panic!("unexpected response for {path}: {other:?}"),
        }
        match node
            .call(Request::ReadFile {
                path: path.into(),
                mode: ReadMode::Full,
                offset: None,
                length: None,
            })
            .await
        {
            Response::Error { code, .. } => assert_eq!(code, ErrorCode::DisallowedPath),
            other => panic!("unexpected response for {path}: {other:?}"),
        }
    }
    node.daemon.shutdown().await;
}

#[tokio::test]
async fn read_file_windows() {
    let node = TestNode::spawn().await;
    std::fs::write(node.shared_dir.path().join("data.txt"), "0123456789").unwrap();

    let read = |mode, offset, length| {
        node.call(Request::ReadFile { path: "data.txt".into(), mode, offset, length })
    };

    match read(ReadMode::Full, None, None).await {
        Response::FileData { data } => assert_eq!(data, b"0123456789"),
        other => panic!("unexpected response: {other:?}"),
    }
    match read(ReadMode::Head, None, Some(3)).await {
        Response::FileData { data } => assert_eq!(data, b"012"),
        other => panic!("unexpected response: {other:?}"),
    }
    match read(ReadMode::Tail, None, Some(3)).await {
        Response::FileData { data } => assert_eq!(data, b"789"),
        other => panic!("unexpected response: {other:?}"),
    }
    match read(ReadMode::Range, Some(4), Some(2)).await {
        Response::FileData { data } => assert_eq!(data, b"45"),
        other => panic!("unexpected response: {other:?}"),
    }
    node.daemon.shutdown().await;
}

#[tokio::test]
async fn read_missing_file_is_invalid_argument() {
    let node = TestNode::spawn().await;
    match node
        .call(Request::ReadFile {
            path: "missing.txt".into(),
            mode: ReadMode::Full,
            offset: None,
            length: None,
        })
        .await
    {
        Response::Error { code, .. } => assert_eq!(code, ErrorCode::InvalidArgument),
        other => panic!("unexpected response: {other:?}"),
    }
    node.daemon.shutdown().await;
}
