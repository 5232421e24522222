use chrono::{TimeZone, Utc};
use genodraw::commands::{
    AddEmotionalRelationshipCommand, AddPartnerRelationshipCommand, AddPersonCommand,
    AddTextAnnotationCommand, AutoLayoutCommand, DeletePersonCommand, DeleteRelationshipCommand,
    DeleteTextAnnotationCommand, MoveNodeCommand, SetNodeVisibilityCommand, UpdatePersonCommand,
};
use genodraw::{
    Command, EditorState, EmotionalStatus, Gender, Genogram, History, LayoutConfig, PartnerStatus,
    PersonPatch, Point, convex_hull,
};
use quickcheck_macros::quickcheck;

fn normalized(state: &EditorState) -> EditorState {
    let mut copy = state.clone();
    if let Some(epoch) = Utc.timestamp_opt(0, 0).single() {
        copy.genogram.metadata.updated_at = epoch;
    }
    copy
}

fn person(n: u8) -> String {
    format!("p{}", n % 6)
}

fn position_of(state: &EditorState, id: &str) -> Point {
    state.layout.position_of(id).unwrap_or_default()
}

fn decode(state: &EditorState, (kind, target, x, y): (u8, u8, i8, i8)) -> Command {
    let at = Point::new(x as f32 * 10.0, y as f32 * 10.0);
    let a = person(target);
    let b = person(target / 6);
    match kind % 11 {
        0 => AddPersonCommand::new(a.to_uppercase(), Gender::Unknown, at, (x % 3) as i32)
            .with_id(a)
            .into(),
        1 => DeletePersonCommand::new(a).into(),
        2 => MoveNodeCommand::new(a, at).into(),
        3 => AddPartnerRelationshipCommand::new(
            a.clone(),
            b.clone(),
            PartnerStatus::Married,
            position_of(state, &a),
            position_of(state, &b),
        )
        .with_id(format!("r{}", target % 8))
        .into(),
        4 => AddEmotionalRelationshipCommand::new(
            a.clone(),
            b.clone(),
            EmotionalStatus::Close,
            position_of(state, &a),
            position_of(state, &b),
        )
        .with_id(format!("r{}", target % 8))
        .into(),
        5 => DeleteRelationshipCommand::new(format!("r{}", target % 8)).into(),
        6 => UpdatePersonCommand::new(
            a,
            PersonPatch {
                name: Some(format!("name {x}")),
                deceased: Some(y % 2 == 0),
                ..PersonPatch::default()
            },
        )
        .into(),
        7 => SetNodeVisibilityCommand::new(a, x % 2 == 0).into(),
        8 => AutoLayoutCommand::new(LayoutConfig::default()).into(),
        9 => AddTextAnnotationCommand::new(format!("note {y}"), at)
            .with_id(format!("n{}", target % 3))
            .into(),
        _ => DeleteTextAnnotationCommand::new(format!("n{}", target % 3)).into(),
    }
}

#[quickcheck]
fn prop_undo_is_inverse_and_redo_reproduces(ops: Vec<(u8, u8, i8, i8)>) {
    let mut state = EditorState::new(Genogram::new("prop"));

    for op in ops {
        let mut command = decode(&state, op);
        let before = normalized(&state);

        command.execute(&mut state);
        let after = normalized(&state);
        assert!(state.genogram.is_consistent(), "dangling relationship after '{}'", command.description());
        assert!(state.is_in_lockstep(), "layout out of step after '{}'", command.description());

        command.undo(&mut state);
        assert_eq!(normalized(&state), before, "undo of '{}'", command.description());

        command.execute(&mut state);
        assert_eq!(normalized(&state), after, "redo of '{}'", command.description());
    }
}

#[quickcheck]
fn prop_history_unwinds_to_start(ops: Vec<(u8, u8, i8, i8)>) {
    let mut state = EditorState::new(Genogram::new("prop"));
    let mut history = History::default();
    let start = normalized(&state);

    for op in ops {
        let command = decode(&state, op);
        history.execute(command, &mut state);
        if op.0 % 2 == 0 {
            history.end_gesture();
        }
    }
    let end = normalized(&state);

    while history.undo(&mut state).is_some() {}
    assert_eq!(normalized(&state), start);

    while history.redo(&mut state).is_some() {}
    assert_eq!(normalized(&state), end);
}

#[quickcheck]
fn prop_move_chain_is_one_step(moves: Vec<(i8, i8)>) {
    let mut state = EditorState::new(Genogram::new("drag"));
    let mut history = History::default();
    history.execute(
        AddPersonCommand::new("A", Gender::Male, Point::new(1.0, 2.0), 0)
            .with_id("a")
            .into(),
        &mut state,
    );
    history.end_gesture();

    let Some(&(last_x, last_y)) = moves.last() else {
        return;
    };
    for (x, y) in &moves {
        history.execute(
            MoveNodeCommand::new("a", Point::new(*x as f32, *y as f32)).into(),
            &mut state,
        );
    }
    let last = Point::new(last_x as f32, last_y as f32);

    assert_eq!(history.undo_depth(), 2);
    assert_eq!(state.layout.nodes["a"].position, last);

    history.undo(&mut state);
    assert_eq!(state.layout.nodes["a"].position, Point::new(1.0, 2.0));
    history.redo(&mut state);
    assert_eq!(state.layout.nodes["a"].position, last);
}

#[quickcheck]
fn prop_hull_encloses_every_point(raw: Vec<(i8, i8)>) -> bool {
    let points: Vec<Point> = raw
        .iter()
        .map(|&(x, y)| Point::new(x as f32, y as f32))
        .collect();
    let hull = convex_hull(&points);
    if hull.len() < 3 {
        return true;
    }

    points.iter().all(|p| {
        hull.iter().zip(hull.iter().cycle().skip(1)).all(|(a, b)| {
            let cross = (b.x - a.x) * (p.y - a.y) - (b.y - a.y) * (p.x - a.x);
            cross >= 0.0
        })
    })
}
