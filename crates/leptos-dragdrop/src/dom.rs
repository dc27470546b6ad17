//! Mouse and touch bindings
//!
//! Press records a pending drag; moving past the threshold starts it; entering
//! another draggable marks it as drop target; release finishes the session
//! against the list's current order.

use std::str::FromStr;

use leptos::prelude::*;
use wasm_bindgen::closure::Closure;
use wasm_bindgen::JsCast;

use crate::{exceeds_threshold, DragSession, DropOutcome};

/// Attribute holding the entity id on draggable elements, used for touch hit-testing
pub const DND_ID_ATTR: &str = "data-dnd-id";

/// Identifier usable as a drag key
pub trait DragId: Copy + PartialEq + FromStr + Send + Sync + 'static {}

impl<T> DragId for T where T: Copy + PartialEq + FromStr + Send + Sync + 'static {}

/// DnD state signals
#[derive(Clone, Copy)]
pub struct DndSignals<Id: DragId> {
    pub session_read: ReadSignal<DragSession<Id>>,
    pub session_write: WriteSignal<DragSession<Id>>,
    pub drag_just_ended_read: ReadSignal<bool>,
    pub drag_just_ended_write: WriteSignal<bool>,
    /// Pending id (pressed but not yet dragging)
    pub pending_id_read: ReadSignal<Option<Id>>,
    pub pending_id_write: WriteSignal<Option<Id>>,
    /// Start position for movement detection
    pub start_x_read: ReadSignal<i32>,
    pub start_x_write: WriteSignal<i32>,
    pub start_y_read: ReadSignal<i32>,
    pub start_y_write: WriteSignal<i32>,
}

impl<Id: DragId> DndSignals<Id> {
    /// Whether `id` is being dragged right now (tracked)
    pub fn is_dragging(&self, id: Id) -> bool {
        self.session_read.with(|session| session.is_dragging(&id))
    }

    /// Whether `id` is the current drop target (tracked)
    pub fn is_drop_target(&self, id: Id) -> bool {
        self.session_read.with(|session| session.drop_target() == Some(&id))
    }
}

pub fn create_dnd_signals<Id: DragId>() -> DndSignals<Id> {
    let (session_read, session_write) = signal(DragSession::<Id>::new());
    let (drag_just_ended_read, drag_just_ended_write) = signal(false);
    let (pending_id_read, pending_id_write) = signal(None::<Id>);
    let (start_x_read, start_x_write) = signal(0i32);
    let (start_y_read, start_y_write) = signal(0i32);
    DndSignals {
        session_read,
        session_write,
        drag_just_ended_read,
        drag_just_ended_write,
        pending_id_read,
        pending_id_write,
        start_x_read,
        start_x_write,
        start_y_read,
        start_y_write,
    }
}

/// End drag operation
pub fn end_drag<Id: DragId>(dnd: &DndSignals<Id>) {
    reset(dnd);
    schedule_just_ended_clear(dnd);
}

fn reset<Id: DragId>(dnd: &DndSignals<Id>) {
    dnd.session_write.update(|session| session.cancel());
    dnd.pending_id_write.set(None);
    dnd.drag_just_ended_write.set(true);
}

/// Lower `drag_just_ended` shortly after release so the trailing click is swallowed
fn schedule_just_ended_clear<Id: DragId>(dnd: &DndSignals<Id>) {
    if let Some(win) = web_sys::window() {
        let clear = dnd.drag_just_ended_write;
        let cb = Closure::<dyn FnMut()>::new(move || {
            clear.set(false);
        });
        let _ = win.set_timeout_with_callback_and_timeout_and_arguments_0(cb.as_ref().unchecked_ref(), 100);
        cb.forget();
    }
}

fn is_interactive(target: Option<web_sys::EventTarget>) -> bool {
    match target {
        Some(target) => {
            target.dyn_ref::<web_sys::HtmlInputElement>().is_some()
                || target.dyn_ref::<web_sys::HtmlButtonElement>().is_some()
        }
        None => false,
    }
}

fn press<Id: DragId>(dnd: DndSignals<Id>, id: Id, x: i32, y: i32) {
    dnd.pending_id_write.set(Some(id));
    dnd.start_x_write.set(x);
    dnd.start_y_write.set(y);
}

/// Start the pending drag once the pointer moved beyond the threshold
fn track_move<Id: DragId>(dnd: DndSignals<Id>, x: i32, y: i32) {
    let pending = dnd.pending_id_read.get_untracked();
    let active = dnd.session_read.with_untracked(|session| session.is_active());

    if let (Some(id), false) = (pending, active) {
        let dx = x - dnd.start_x_read.get_untracked();
        let dy = y - dnd.start_y_read.get_untracked();
        if exceeds_threshold(dx, dy) {
            dnd.session_write.update(|session| session.begin(id));
        }
    }
}

/// Resolve the draggable element under a touch point
fn id_at_point<Id: DragId>(x: i32, y: i32) -> Option<Id> {
    let doc = web_sys::window()?.document()?;
    let element = doc.element_from_point(x as f32, y as f32)?;
    let host = element.closest(&format!("[{}]", DND_ID_ATTR)).ok()??;
    host.get_attribute(DND_ID_ATTR)?.parse().ok()
}

/// Create mousedown handler for draggable entries
pub fn make_on_mousedown<Id: DragId>(dnd: DndSignals<Id>, id: Id) -> impl Fn(web_sys::MouseEvent) + Copy + 'static {
    move |ev: web_sys::MouseEvent| {
        if ev.button() == 0 && !is_interactive(ev.target()) {
            press(dnd, id, ev.client_x(), ev.client_y());
        }
    }
}

/// Create touchstart handler for draggable entries
pub fn make_on_touchstart<Id: DragId>(dnd: DndSignals<Id>, id: Id) -> impl Fn(web_sys::TouchEvent) + Copy + 'static {
    move |ev: web_sys::TouchEvent| {
        if is_interactive(ev.target()) {
            return;
        }
        if let Some(touch) = ev.touches().get(0) {
            press(dnd, id, touch.client_x(), touch.client_y());
        }
    }
}

/// Create mouseenter handler for entries (become drop target)
pub fn make_on_mouseenter<Id: DragId>(dnd: DndSignals<Id>, id: Id) -> impl Fn(web_sys::MouseEvent) + Copy + 'static {
    move |_ev: web_sys::MouseEvent| enter(dnd, id)
}

fn enter<Id: DragId>(dnd: DndSignals<Id>, id: Id) {
    let dragging = dnd.session_read.with_untracked(|session| session.dragging().copied());
    // Don't target self
    if matches!(dragging, Some(dragged) if dragged != id) {
        dnd.session_write.update(|session| session.hover(id));
    }
}

/// Touch has no enter/leave on other elements: hover whatever was hit-tested
fn touch_hover<Id: DragId>(dnd: DndSignals<Id>, hit: Option<Id>) {
    let dragging = dnd.session_read.with_untracked(|session| session.dragging().copied());
    if let Some(dragged) = dragging {
        match hit {
            Some(id) if id != dragged => dnd.session_write.update(|session| session.hover(id)),
            _ => dnd.session_write.update(|session| session.leave()),
        }
    }
}

/// Create mouseleave handler
pub fn make_on_mouseleave<Id: DragId>(dnd: DndSignals<Id>) -> impl Fn(web_sys::MouseEvent) + Copy + 'static {
    move |_ev: web_sys::MouseEvent| {
        if dnd.session_read.with_untracked(|session| session.is_active()) {
            dnd.session_write.update(|session| session.leave());
        }
    }
}

fn add_document_listener(event: &str, callback: &wasm_bindgen::JsValue) {
    if let Some(doc) = web_sys::window().and_then(|win| win.document()) {
        let _ = doc.add_event_listener_with_callback(event, callback.unchecked_ref());
    }
}

/// Bind document-level move handlers (mouse and touch)
pub fn bind_global_move<Id: DragId>(dnd: DndSignals<Id>) {
    let on_mousemove = Closure::<dyn FnMut(web_sys::MouseEvent)>::new(move |ev: web_sys::MouseEvent| {
        track_move(dnd, ev.client_x(), ev.client_y());
    });
    add_document_listener("mousemove", on_mousemove.as_ref());
    on_mousemove.forget();

    let on_touchmove = Closure::<dyn FnMut(web_sys::TouchEvent)>::new(move |ev: web_sys::TouchEvent| {
        let Some(touch) = ev.touches().get(0) else { return };
        let (x, y) = (touch.client_x(), touch.client_y());
        track_move(dnd, x, y);
        if dnd.session_read.with_untracked(|session| session.is_active()) {
            touch_hover(dnd, id_at_point::<Id>(x, y));
        }
    });
    add_document_listener("touchmove", on_touchmove.as_ref());
    on_touchmove.forget();
}

/// Finish the gesture against the order shown right now and report a reorder.
///
/// Clears the session whatever the outcome.
fn release<Id, O, F>(dnd: DndSignals<Id>, current_order: &O, on_reorder: &F)
where
    Id: DragId,
    O: Fn() -> Vec<Id>,
    F: Fn(Vec<Id>),
{
    dnd.pending_id_write.set(None);
    let mut session = dnd.session_read.get_untracked();
    let outcome = session.finish(&current_order());
    reset(&dnd);
    if let DropOutcome::Reorder(order) = outcome {
        on_reorder(order);
    }
}

/// Bind document-level release handlers.
///
/// `current_order` must return the order as displayed at release time; the
/// drop is computed against it, never against a snapshot taken at drag start.
pub fn bind_global_drop<Id, O, F>(dnd: DndSignals<Id>, current_order: O, on_reorder: F)
where
    Id: DragId,
    O: Fn() -> Vec<Id> + Clone + 'static,
    F: Fn(Vec<Id>) + Clone + 'static,
{
    let on_release = move || {
        release(dnd, &current_order, &on_reorder);
        schedule_just_ended_clear(&dnd);
    };

    let release_mouse = on_release.clone();
    let on_mouseup = Closure::<dyn FnMut(web_sys::MouseEvent)>::new(move |_ev: web_sys::MouseEvent| {
        release_mouse();
    });
    add_document_listener("mouseup", on_mouseup.as_ref());
    on_mouseup.forget();

    let on_touchend = Closure::<dyn FnMut(web_sys::TouchEvent)>::new(move |_ev: web_sys::TouchEvent| {
        on_release();
    });
    add_document_listener("touchend", on_touchend.as_ref());
    on_touchend.forget();

    bind_global_move(dnd);
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use super::*;
    use crate::DRAG_THRESHOLD_PX;

    fn drag(dnd: DndSignals<u32>, dragged: u32, target: u32) {
        press(dnd, dragged, 100, 100);
        track_move(dnd, 100 + DRAG_THRESHOLD_PX + 1, 100);
        enter(dnd, target);
    }

    #[test]
    fn test_small_move_keeps_drag_pending() {
        let dnd = create_dnd_signals::<u32>();
        press(dnd, 2, 100, 100);

        track_move(dnd, 100 + DRAG_THRESHOLD_PX, 100 - DRAG_THRESHOLD_PX);

        assert_eq!(dnd.pending_id_read.get_untracked(), Some(2));
        assert!(!dnd.session_read.with_untracked(|s| s.is_active()));

        track_move(dnd, 100, 100 + DRAG_THRESHOLD_PX + 1);
        assert!(dnd.session_read.with_untracked(|s| s.is_dragging(&2)));
    }

    #[test]
    fn test_entering_self_is_not_a_target() {
        let dnd = create_dnd_signals::<u32>();
        drag(dnd, 2, 2);
        assert_eq!(dnd.session_read.with_untracked(|s| s.drop_target().copied()), None);

        enter(dnd, 1);
        assert!(dnd.is_drop_target(1));
    }

    #[test]
    fn test_enter_without_drag_is_ignored() {
        let dnd = create_dnd_signals::<u32>();
        enter(dnd, 1);
        assert_eq!(dnd.session_read.with_untracked(|s| s.drop_target().copied()), None);
    }

    #[test]
    fn test_touch_hit_test_hovers_and_leaves() {
        let dnd = create_dnd_signals::<u32>();
        drag(dnd, 3, 1);

        touch_hover(dnd, Some(2));
        assert!(dnd.is_drop_target(2));

        touch_hover(dnd, Some(3));
        assert_eq!(dnd.session_read.with_untracked(|s| s.drop_target().copied()), None);

        touch_hover(dnd, Some(1));
        touch_hover(dnd, None);
        assert_eq!(dnd.session_read.with_untracked(|s| s.drop_target().copied()), None);
    }

    #[test]
    fn test_release_uses_order_at_release_time() {
        let dnd = create_dnd_signals::<u32>();
        let shown = Rc::new(RefCell::new(vec![1, 2, 3]));
        let reported = Rc::new(RefCell::new(Vec::new()));

        drag(dnd, 3, 1);
        // List changed mid-drag
        shown.borrow_mut().insert(0, 4);

        let order = shown.clone();
        let sink = reported.clone();
        release(dnd, &move || order.borrow().clone(), &move |next: Vec<u32>| sink.borrow_mut().push(next));

        assert_eq!(*reported.borrow(), vec![vec![4, 3, 1, 2]]);
        assert!(!dnd.session_read.with_untracked(|s| s.is_active()));
        assert_eq!(dnd.pending_id_read.get_untracked(), None);
        assert!(dnd.drag_just_ended_read.get_untracked());
    }

    #[test]
    fn test_click_release_reports_nothing() {
        let dnd = create_dnd_signals::<u32>();
        let calls = Rc::new(RefCell::new(0));
        press(dnd, 1, 10, 10);

        let sink = calls.clone();
        release(dnd, &|| vec![1, 2], &move |_: Vec<u32>| *sink.borrow_mut() += 1);

        assert_eq!(*calls.borrow(), 0);
        assert_eq!(dnd.pending_id_read.get_untracked(), None);
    }
}
