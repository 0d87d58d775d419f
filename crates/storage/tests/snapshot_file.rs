use journey_core::model::{LearnerId, MiniQuestionId, TopicId};
use storage::repository::StorageError;
use storage::snapshot::{SnapshotError, SnapshotFile};

const SNAPSHOT: &str = r#"{
    "curriculum": {
        "modules": [{ "id": 1, "number": 1, "title": "Basics", "is_released": true }],
        "topics": [
            { "id": 10, "module_id": 1, "number": 1, "title": "Intro", "is_released": true }
        ],
        "sections": [{ "id": 100, "topic_id": 10, "title": "Read", "position": 0 }],
        "mini_questions": [
            { "id": 1000, "section_id": 100, "title": "Warm-up", "is_released": true,
              "release_at": "2025-01-01T00:00:00Z" }
        ]
    },
    "learners": [{ "id": 1, "name": "Ada" }],
    "mini_question_answers": [
        { "learner_id": 1, "mini_question_id": 1000, "content": "first",
          "submitted_at": "2025-02-01T00:00:00Z" },
        { "learner_id": 1, "mini_question_id": 1000, "content": "second",
          "submitted_at": "2025-02-02T00:00:00Z" }
    ]
}"#;

#[tokio::test]
async fn reads_snapshot_from_disk_into_storage() {
    let path = std::env::temp_dir().join("journey_snapshot_file_test.json");
    std::fs::write(&path, SNAPSHOT).expect("write snapshot");

    let (storage, report) = SnapshotFile::read(&path)
        .expect("read")
        .into_storage()
        .await
        .expect("load");
    std::fs::remove_file(&path).ok();

    assert_eq!(report.learners, 1);
    assert_eq!(report.mini_question_answers, 2);

    let curriculum = storage.curriculum.snapshot().await.expect("snapshot");
    assert_eq!(curriculum.topics[0].id, TopicId::new(10));

    let answers = storage
        .answers
        .learner_answers(LearnerId::new(1))
        .await
        .expect("answers");
    assert_eq!(answers.mini_question_answers.len(), 1);
    assert_eq!(answers.mini_question_answers[0].content, "second");
    assert!(answers.has_answered_mini_question(MiniQuestionId::new(1000)));
}

#[tokio::test]
async fn duplicate_answer_ids_are_rejected() {
    let answer = r#"{ "id": 3, "learner_id": 1, "topic_id": 10, "content": "x",
                      "submitted_at": "2025-03-01T00:00:00Z" }"#;
    let json = format!(r#"{{ "topic_answers": [{answer}, {answer}] }}"#);
    let err = SnapshotFile::from_json(&json)
        .expect("parse")
        .into_storage()
        .await
        .err()
        .expect("duplicate should fail");
    assert!(matches!(err, SnapshotError::DuplicateAnswer(id) if id.value() == 3));
}

#[tokio::test]
async fn exhausted_answer_ids_fail_the_load() {
    let json = r#"{
        "curriculum": {
            "modules": [{ "id": 1, "number": 1, "title": "Basics", "is_released": true }],
            "topics": [{ "id": 10, "module_id": 1, "number": 1, "title": "Intro" }]
        },
        "topic_answers": [{ "id": 18446744073709551615, "learner_id": 1, "topic_id": 10,
                            "content": "x", "submitted_at": "2025-03-01T00:00:00Z" }],
        "legacy_topic_answers": [{ "learner_id": 2, "module_number": 1, "question_number": 1,
                                   "content": "old", "submitted_at": "2024-03-01T00:00:00Z" }]
    }"#;
    let err = SnapshotFile::from_json(json)
        .expect("parse")
        .into_storage()
        .await
        .err()
        .expect("id overflow should fail");
    assert!(matches!(err, SnapshotError::Storage(StorageError::Conflict)));
}
