//! End-to-end flows across targets, widgets, the scheduler and preferences.

use std::cell::{Cell, RefCell};
use std::rc::Rc;
use std::time::Duration;

use lattice_binding::widget::{AssetDisplay, ManualClock, TextDisplay};
use lattice_binding::{
    ActivationStack, BindingError, CallbackScheduler, CaptureResource, Comparison, Condition,
    ConditionWidget, EnumType, EnumValue, Expression, ImageSwapper, InputActionHost,
    InputActionLayer, Logic, Phase, PreferenceStore, Preferences, PropertyObject,
    PropertyReference, RepeatTiming, RepeatTrigger, TextFormatter, TickCallback, ValueKinds,
};

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter("lattice_binding=trace")
        .with_test_writer()
        .try_init();
}

#[derive(Default)]
struct Hud {
    asset: Cell<Option<usize>>,
    text: RefCell<String>,
    updates: Cell<usize>,
}

impl AssetDisplay for Hud {
    fn is_active(&self) -> bool {
        true
    }

    fn set_displayed_asset(&self, index: Option<usize>) {
        self.updates.set(self.updates.get() + 1);
        self.asset.set(index);
    }
}

impl TextDisplay for Hud {
    fn is_active(&self) -> bool {
        true
    }

    fn set_displayed_text(&self, text: &str) {
        self.updates.set(self.updates.get() + 1);
        *self.text.borrow_mut() = text.to_string();
    }
}

#[test]
fn test_condition_drives_visual_widgets_in_one_tick() {
    init_tracing();
    let scheduler = Rc::new(CallbackScheduler::new());

    let weather = EnumType::sequential("Weather", ["Clear", "Rain", "Storm"]);
    let world = PropertyObject::new("world", "World");
    let sky = PropertyObject::new("sky", "Sky");
    sky.add_value("weather", EnumValue::new(&weather, 0));
    sky.add_value("wind", 3);
    world.add_child("sky", sky.clone());
    world.add_value("alert", false);

    // Alert when it storms or the wind is strong.
    let mut condition = Condition::new();
    condition.push(Expression::new(
        Logic::Or,
        Comparison::Equal("Storm".into()),
        PropertyReference::with_target(world.clone(), "sky.weather", ValueKinds::ENUM),
    ));
    condition.push(Expression::new(
        Logic::Or,
        Comparison::GreaterOrEqual(10.into()),
        PropertyReference::with_target(world.clone(), "sky/wind", ValueKinds::NUMERIC),
    ));
    let alert = ConditionWidget::new("storm alert", scheduler.clone(), condition);
    alert.set_output(Some(PropertyReference::with_target(
        world.clone(),
        "alert",
        ValueKinds::BOOLEAN,
    )));

    let hud = Rc::new(Hud::default());
    let icon = ImageSwapper::new(
        "alert icon",
        scheduler.clone(),
        PropertyReference::with_target(world.clone(), "alert", ValueKinds::EVERYTHING),
        hud.clone(),
        2,
    );
    let label = TextFormatter::new(
        "wind label",
        scheduler.clone(),
        PropertyReference::with_target(world.clone(), "sky.wind", ValueKinds::EVERYTHING),
        hud.clone(),
    );
    label.set_format("D2");
    label.set_suffix(" m/s");

    // Visual widgets enabled first still run after the condition widget.
    icon.enable();
    label.enable();
    alert.enable();

    let report = scheduler.tick();
    assert_eq!(report.invoked, 3);
    assert_eq!(report.failed, 0);
    assert_eq!(hud.asset.get(), Some(0));
    assert_eq!(*hud.text.borrow(), "03 m/s");

    sky.set("weather", EnumValue::named(&weather, "Storm").unwrap())
        .unwrap();
    scheduler.tick();
    assert!(alert.value());
    assert_eq!(hud.asset.get(), Some(1));

    let updates = hud.updates.get();
    scheduler.tick();
    assert_eq!(hud.updates.get(), updates);

    alert.disable();
    icon.disable();
    label.disable();
    assert!(scheduler.is_empty());
}

#[test]
fn test_failing_callback_does_not_stop_widgets() {
    init_tracing();
    let scheduler = Rc::new(CallbackScheduler::new());
    let target = PropertyObject::new("panel", "Panel");
    target.add_value("count", 1);

    let failing: Rc<dyn TickCallback> =
        Rc::new(|| -> lattice_binding::Result<()> { Err(BindingError::callback("offline")) });
    scheduler.register(Phase::Update, -100, &failing);

    let hud = Rc::new(Hud::default());
    let label = TextFormatter::new(
        "count",
        scheduler.clone(),
        PropertyReference::with_target(target.clone(), "count", ValueKinds::INT32),
        hud.clone(),
    );
    label.enable();

    let report = scheduler.tick();
    assert_eq!(report.failed, 1);
    assert_eq!(report.invoked, 1);
    assert_eq!(*hud.text.borrow(), "1");
    assert!(scheduler.contains(Phase::Update, -100, &failing));
    label.disable();
}

#[test]
fn test_reconfigured_target_needs_refresh() {
    let scheduler = Rc::new(CallbackScheduler::new());
    let target = PropertyObject::new("panel", "Panel");
    target.add_value("level", 1);

    let hud = Rc::new(Hud::default());
    let icon = ImageSwapper::new(
        "level icon",
        scheduler.clone(),
        PropertyReference::with_target(target.clone(), "level", ValueKinds::EVERYTHING),
        hud.clone(),
        4,
    );

    let structural = Rc::new(Cell::new(0));
    let seen = structural.clone();
    target.structure_changed().connect(move |_path| seen.set(seen.get() + 1));

    icon.enable();
    scheduler.tick();
    assert_eq!(hud.asset.get(), Some(1));

    // Replacing the member keeps the cached handle to the old slot until refresh.
    target.add_value("level", 3);
    assert_eq!(structural.get(), 1);
    scheduler.tick();
    assert_eq!(hud.asset.get(), Some(1));

    icon.refresh();
    scheduler.tick();
    assert_eq!(hud.asset.get(), Some(3));
    icon.disable();
}

#[derive(Default)]
struct Actions {
    enabled: RefCell<Vec<String>>,
}

impl InputActionHost for Actions {
    fn enable_action(&self, name: &str) {
        self.enabled.borrow_mut().push(name.to_string());
    }

    fn disable_action(&self, name: &str) {
        self.enabled.borrow_mut().retain(|action| action != name);
    }
}

#[test]
fn test_menu_and_dialog_share_input() {
    let host = Rc::new(Actions::default());
    let stack = ActivationStack::new();

    let menu: Rc<dyn CaptureResource> = Rc::new(InputActionLayer::new(
        "menu",
        Some(host.clone() as Rc<dyn InputActionHost>),
        ["menu/navigate", "menu/select"],
    ));
    let dialog: Rc<dyn CaptureResource> = Rc::new(InputActionLayer::new(
        "dialog",
        Some(host.clone() as Rc<dyn InputActionHost>),
        ["dialog/confirm"],
    ));

    stack.activate(&menu);
    stack.activate(&dialog);
    assert_eq!(*host.enabled.borrow(), vec!["dialog/confirm"]);

    // The menu is torn down first while the dialog stays up.
    assert!(stack.deactivate(&menu));
    assert_eq!(*host.enabled.borrow(), vec!["dialog/confirm"]);
    assert_eq!(stack.len(), 1);

    assert!(stack.deactivate(&dialog));
    assert!(host.enabled.borrow().is_empty());
    assert!(stack.is_empty());
    assert!(!stack.deactivate(&dialog));
}

#[test]
fn test_repeat_timing_from_preferences_file() {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("input.toml");

    let prefs = Preferences::new();
    RepeatTiming {
        delay: 0.2,
        interval: 0.05,
    }
    .store(&prefs);
    prefs.set_string("ui.theme", "dark");
    prefs.save_toml(&path).unwrap();

    let loaded = Preferences::load_toml(&path).unwrap();
    assert_eq!(loaded.get_string("ui/theme").as_deref(), Some("dark"));

    let scheduler = Rc::new(CallbackScheduler::new());
    let clock = Rc::new(ManualClock::new());
    let pad = PropertyObject::new("pad", "Gamepad");
    pad.add_value("held", true);
    let trigger = RepeatTrigger::from_preferences(
        "scroll",
        scheduler.clone(),
        PropertyReference::with_target(pad.clone(), "held", ValueKinds::BOOLEAN),
        &loaded,
        clock.clone(),
    );
    assert_eq!(trigger.timing().delay, 0.2);

    let fired = Rc::new(Cell::new(0));
    let count = fired.clone();
    trigger.fired().connect(move |_| count.set(count.get() + 1));
    trigger.enable();

    for _ in 0..10 {
        scheduler.tick();
        clock.advance(Duration::from_millis(50));
    }
    // Press at 0 ms, first repeat at 200 ms, then every 50 ms up to 450 ms.
    assert_eq!(fired.get(), 7);
    trigger.disable();
}

#[test]
fn test_missing_preferences_file() {
    let dir = tempfile::tempdir().unwrap();
    let err = Preferences::load_toml(dir.path().join("absent.toml")).unwrap_err();
    assert!(matches!(err, BindingError::Preferences { .. }));
}
