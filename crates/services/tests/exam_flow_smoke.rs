use std::sync::Arc;
use std::time::Duration;

use api::{Api, InMemoryExamApi};
use prep_core::model::{
    AnswerOption, ExamPlan, ExamResult, Question, QuestionId, ResultId, ResultItem, TestId,
};
use prep_core::time::fixed_clock;
use services::{
    CountdownTimer, ExamLoopService, ExamPlanService, ExamView, ResultService, SubmitOutcome,
    SubmitTrigger, TickOutcome,
};

fn question(id: &str, correct: usize) -> Question {
    let options = ["A", "B", "C", "D"]
        .iter()
        .enumerate()
        .map(|(i, text)| AnswerOption::new(*text, i == correct))
        .collect();
    Question::new(QuestionId::new(id), format!("Question {id}"), options, None).unwrap()
}

fn seeded_api(test_id: &TestId) -> InMemoryExamApi {
    let api = InMemoryExamApi::new();
    api.insert_test(
        test_id.clone(),
        vec![question("q1", 1), question("q2", 0), question("q3", 2)],
    );
    api
}

#[tokio::test]
async fn plan_take_submit_and_review() {
    let memory = InMemoryExamApi::new();
    let api = Api::in_memory(memory.clone());

    let plan = ExamPlan::from_subject_list("Mathematics");
    let test_id = ExamPlanService::new(Arc::clone(&api.generation))
        .generate(&plan)
        .await
        .unwrap();
    memory.insert_test(
        test_id.clone(),
        vec![question("q1", 1), question("q2", 0), question("q3", 2)],
    );

    let exams = ExamLoopService::new(fixed_clock(), Arc::clone(&api.exams));
    let mut session = exams
        .start_exam(test_id.clone(), Some(plan.time_limit_minutes()))
        .await
        .unwrap();

    for (id, index) in [("q1", 1), ("q2", 1), ("q3", 2), ("q2", 0)] {
        session.select_answer(&QuestionId::new(id), index).unwrap();
    }
    assert_eq!(session.live_score(), 3);
    assert!(ExamView::from_session(&session).can_submit);

    let SubmitOutcome::Submitted { result_id } = exams
        .submit(&mut session, SubmitTrigger::Manual)
        .await
        .unwrap()
    else {
        panic!("expected a submitted outcome");
    };

    let (_, submission) = &memory.submissions()[0];
    let payload: Vec<_> = submission
        .answers
        .iter()
        .map(|a| (a.question_id.as_str(), a.selected_index))
        .collect();
    assert_eq!(payload, vec![("q1", 1), ("q2", 0), ("q3", 2)]);

    let item = ResultItem {
        question_id: QuestionId::new("q1"),
        prompt: "Question q1".into(),
        options: vec!["A".into(), "B".into()],
        user_index: 1,
        correct_index: 1,
        correct: true,
        explanation: None,
        subject: None,
        topics: Vec::new(),
    };
    memory.insert_result(
        test_id.clone(),
        result_id.clone(),
        ExamResult::new(100, Some(3), vec![item]),
    );
    let result = ResultService::new(Arc::clone(&api.results))
        .fetch(&test_id, &result_id)
        .await
        .unwrap();
    assert_eq!(result.total, 3);
    assert_eq!(result_id, ResultId::new("result-1"));
}

#[tokio::test(start_paused = true)]
async fn timer_driven_expiry_submits_once() {
    let test_id = TestId::new("timed");
    let memory = seeded_api(&test_id);
    let exams = ExamLoopService::new(fixed_clock(), Arc::new(memory.clone()));
    let mut session = exams.start_exam(test_id, Some(1)).await.unwrap();
    session.select_answer(&QuestionId::new("q3"), 2).unwrap();

    let started = tokio::time::Instant::now();
    let (timer, mut ticks) = CountdownTimer::every_second();
    let result_id = loop {
        ticks.recv().await.unwrap();
        match exams.tick(&mut session).await {
            TickOutcome::Running { .. } => {}
            TickOutcome::Submitted { result_id } => break result_id,
            other => panic!("unexpected tick outcome: {other:?}"),
        }
    };
    timer.stop();

    assert_eq!(started.elapsed(), Duration::from_secs(60));
    assert_eq!(session.result_id(), Some(&result_id));
    assert_eq!(memory.submission_count(), 1);
    let (_, submission) = &memory.submissions()[0];
    let indices: Vec<_> = submission.answers.iter().map(|a| a.selected_index).collect();
    assert_eq!(indices, vec![-1, -1, 2]);
}
