//! Property-based tests for the session state machine.
//!
//! Random operation sequences are replayed against a scripted service and
//! checked after every step:
//!
//! - An empty document implies an empty conversation
//! - Every operation settles with `loading` cleared
//! - A ready turn appends exactly two messages
//! - History changes only on a successful turn, and then to the server's copy
//! - Skipped and rejected operations never reach the service

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use proptest::prelude::*;

    use crate::error::Error;
    use crate::service::{DocumentUpload, TurnReply};
    use crate::session::{Role, SessionOrchestrator, SessionPhase};
    use crate::testing::{spawn_bridge, ScriptedService};

    #[derive(Debug, Clone)]
    enum Op {
        UploadOk,
        UploadRejectedByServer,
        UploadNotPdf,
        Ask(String),
        AskFails,
        AskBlank,
        Clear,
    }

    fn question() -> impl Strategy<Value = String> {
        "[a-z]{1,12}( [a-z]{1,8}){0,3}"
    }

    fn op() -> impl Strategy<Value = Op> {
        prop_oneof![
            2 => Just(Op::UploadOk),
            1 => Just(Op::UploadRejectedByServer),
            1 => Just(Op::UploadNotPdf),
            4 => question().prop_map(Op::Ask),
            2 => Just(Op::AskFails),
            1 => Just(Op::AskBlank),
            1 => Just(Op::Clear),
        ]
    }

    fn runtime() -> tokio::runtime::Runtime {
        tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap()
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(48))]

        /// Invariants hold after every step of any operation sequence.
        #[test]
        fn session_invariants_hold(ops in prop::collection::vec(op(), 1..24)) {
            let result: Result<(), TestCaseError> = runtime().block_on(async {
                let service = Arc::new(ScriptedService::new());
                let (bridge, _store) = spawn_bridge(service.clone());
                let orchestrator = SessionOrchestrator::new(service.clone(), bridge);

                for op in ops {
                    let before = orchestrator.snapshot().await;
                    let ingest_before = service.ingest_calls();
                    let turns_before = service.turn_calls();

                    match &op {
                        Op::UploadOk => {
                            orchestrator
                                .start_upload(DocumentUpload::pdf("doc.pdf", vec![0u8; 32]))
                                .await;
                            let after = orchestrator.snapshot().await;
                            prop_assert_eq!(after.phase(), SessionPhase::Ready);
                            prop_assert!(after.messages.is_empty());
                            prop_assert_eq!(service.ingest_calls(), ingest_before + 1);
                        }
                        Op::UploadRejectedByServer => {
                            service.push_ingest(Err(Error::server(Some(500), "Processing failed")));
                            orchestrator
                                .start_upload(DocumentUpload::pdf("doc.pdf", vec![0u8; 32]))
                                .await;
                            let after = orchestrator.snapshot().await;
                            prop_assert_eq!(after.phase(), SessionPhase::Empty);
                            prop_assert!(after.last_error.is_some());
                        }
                        Op::UploadNotPdf => {
                            orchestrator
                                .start_upload(DocumentUpload::new("a.txt", "text/plain", b"x".to_vec()))
                                .await;
                            let after = orchestrator.snapshot().await;
                            prop_assert_eq!(service.ingest_calls(), ingest_before);
                            prop_assert_eq!(after.phase(), SessionPhase::Empty);
                            prop_assert_eq!(after.last_error.as_deref(), Some("Please select a PDF file"));
                        }
                        Op::Ask(q) => {
                            orchestrator.send_message(q).await;
                            let after = orchestrator.snapshot().await;
                            if before.document_ready {
                                let mut expected = before.conversation_history.clone();
                                expected.push(format!("Q: {} A: Answer to: {}", q, q));
                                prop_assert_eq!(&after.conversation_history, &expected);
                                prop_assert_eq!(after.messages.len(), before.messages.len() + 2);
                            } else {
                                prop_assert_eq!(service.turn_calls(), turns_before);
                                prop_assert_eq!(&after, &before);
                            }
                        }
                        Op::AskFails => {
                            if before.document_ready {
                                service.push_turn(Err(Error::network("Failed to send message")));
                            }
                            orchestrator.send_message("will this fail").await;
                            let after = orchestrator.snapshot().await;
                            prop_assert_eq!(&after.conversation_history, &before.conversation_history);
                            if before.document_ready {
                                prop_assert_eq!(after.messages.len(), before.messages.len() + 2);
                                let last = after.messages.last().unwrap();
                                prop_assert_eq!(last.role, Role::Assistant);
                                prop_assert!(last.content.starts_with("Error: "));
                            } else {
                                prop_assert_eq!(&after, &before);
                            }
                        }
                        Op::AskBlank => {
                            orchestrator.send_message("  \t ").await;
                            prop_assert_eq!(service.turn_calls(), turns_before);
                            prop_assert_eq!(&orchestrator.snapshot().await, &before);
                        }
                        Op::Clear => {
                            orchestrator.clear().await;
                            let after = orchestrator.snapshot().await;
                            prop_assert_eq!(after.document_ready, before.document_ready);
                            prop_assert!(after.messages.is_empty());
                            prop_assert!(after.conversation_history.is_empty());
                        }
                    }

                    let after = orchestrator.snapshot().await;
                    prop_assert!(after.is_consistent(), "inconsistent after {:?}: {:?}", op, after);
                    prop_assert!(!after.loading, "still loading after {:?}", op);
                }
                Ok(())
            });
            result?;
        }

        /// A reply's history always replaces the local copy.
        #[test]
        fn history_is_replaced_by_server_copy(
            server_history in prop::collection::vec("[a-z ]{0,16}", 0..6)
        ) {
            let result: Result<(), TestCaseError> = runtime().block_on(async {
                let service = Arc::new(ScriptedService::new());
                let (bridge, _store) = spawn_bridge(service.clone());
                let orchestrator = SessionOrchestrator::new(service.clone(), bridge);
                orchestrator
                    .start_upload(DocumentUpload::pdf("doc.pdf", vec![0u8; 8]))
                    .await;
                orchestrator.send_message("seed the history").await;

                service.push_turn(Ok(TurnReply {
                    answer: "ok".into(),
                    sources: Vec::new(),
                    updated_history: server_history.clone(),
                }));
                orchestrator.send_message("replace it").await;

                prop_assert_eq!(orchestrator.snapshot().await.conversation_history, server_history);
                Ok(())
            });
            result?;
        }
    }
}
