use bitflags::bitflags;
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

pub const EDITOR_KIND_TEXT: &str = "text";
pub const EDITOR_KIND_BOOLEAN: &str = "boolean";
pub const EDITOR_KIND_COLOR: &str = "color";

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct PropertyFlags: u32 {
        const NORMAL = 1 << 0;
        const INVISIBLE = 1 << 1;
        const NON_PERSISTED = 1 << 2;
    }
}

impl Default for PropertyFlags {
    fn default() -> Self {
        PropertyFlags::NORMAL
    }
}

/// A property as presented to an editor instance: what to edit, how to label
/// it, and which editor kind renders it.
#[derive(Debug, Clone, PartialEq)]
pub struct EditableProperty {
    pub name: String,
    pub caption: String,
    pub value: String,
    pub editor_kind: String,
    pub editor_args: Vec<String>,
    pub flags: PropertyFlags,
}

impl EditableProperty {
    pub fn new(name: impl Into<String>, value: impl Into<String>, editor_kind: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            caption: name.clone(),
            name,
            value: value.into(),
            editor_kind: editor_kind.into(),
            editor_args: Vec::new(),
            flags: PropertyFlags::default(),
        }
    }

    pub fn with_caption(mut self, caption: impl Into<String>) -> Self {
        self.caption = caption.into();
        self
    }

    pub fn with_args(mut self, args: Vec<String>) -> Self {
        self.editor_args = args;
        self
    }

    pub fn with_flags(mut self, flags: PropertyFlags) -> Self {
        self.flags = flags;
        self
    }
}

/// A stateful property-editor controller. Rendering is the host's problem;
/// the core only constructs, pools, and rebinds these.
pub trait PropertyEditor {
    fn kind(&self) -> &'static str;

    /// Rebinds the editor to a property. The only side effect of pool
    /// acquisition.
    fn bind(&mut self, property: EditableProperty);

    fn property(&self) -> Option<&EditableProperty>;

    fn display_value(&self) -> String {
        self.property().map(|p| p.value.clone()).unwrap_or_default()
    }
}

pub type SharedEditor = Rc<RefCell<dyn PropertyEditor>>;
pub type EditorFactory = Box<dyn Fn() -> SharedEditor>;

#[derive(Default)]
pub struct TextPropertyEditor {
    bound: Option<EditableProperty>,
}

impl PropertyEditor for TextPropertyEditor {
    fn kind(&self) -> &'static str {
        EDITOR_KIND_TEXT
    }

    fn bind(&mut self, property: EditableProperty) {
        self.bound = Some(property);
    }

    fn property(&self) -> Option<&EditableProperty> {
        self.bound.as_ref()
    }
}

#[derive(Default)]
pub struct BooleanPropertyEditor {
    bound: Option<EditableProperty>,
    checked: bool,
}

impl BooleanPropertyEditor {
    pub fn is_checked(&self) -> bool {
        self.checked
    }
}

impl PropertyEditor for BooleanPropertyEditor {
    fn kind(&self) -> &'static str {
        EDITOR_KIND_BOOLEAN
    }

    fn bind(&mut self, property: EditableProperty) {
        self.checked = property.value.eq_ignore_ascii_case("true");
        self.bound = Some(property);
    }

    fn property(&self) -> Option<&EditableProperty> {
        self.bound.as_ref()
    }
}

#[derive(Default)]
pub struct ColorPropertyEditor {
    bound: Option<EditableProperty>,
    rgb: u32,
}

impl ColorPropertyEditor {
    pub fn rgb(&self) -> u32 {
        self.rgb
    }
}

impl PropertyEditor for ColorPropertyEditor {
    fn kind(&self) -> &'static str {
        EDITOR_KIND_COLOR
    }

    fn bind(&mut self, property: EditableProperty) {
        self.rgb = property
            .value
            .strip_prefix('#')
            .and_then(|hex| u32::from_str_radix(hex, 16).ok())
            .unwrap_or(0);
        self.bound = Some(property);
    }

    fn property(&self) -> Option<&EditableProperty> {
        self.bound.as_ref()
    }

    fn display_value(&self) -> String {
        format!("#{:06X}", self.rgb)
    }
}

/// Reuse cache for property editors. Constructing one is cheap; the state it
/// accumulates (focus, expansion, popup position) is not, so a full panel
/// redraw should hand back the same instances it used last time.
///
/// Each refresh cycle starts with `begin_cycle()`; within a cycle the n-th
/// acquisition of a kind yields the n-th pooled instance of that kind,
/// constructing it on first use. Instances are issued in strict allocation
/// order and never skipped.
pub struct PropertyEditorPool {
    factories: HashMap<String, EditorFactory>,
    cached: HashMap<String, Vec<SharedEditor>>,
    counts: HashMap<String, usize>,
}

impl PropertyEditorPool {
    pub fn new() -> Self {
        let mut pool =
            Self { factories: HashMap::new(), cached: HashMap::new(), counts: HashMap::new() };
        pool.register_factory(EDITOR_KIND_TEXT, || {
            Rc::new(RefCell::new(TextPropertyEditor::default()))
        });
        pool.register_factory(EDITOR_KIND_BOOLEAN, || {
            Rc::new(RefCell::new(BooleanPropertyEditor::default()))
        });
        pool.register_factory(EDITOR_KIND_COLOR, || {
            Rc::new(RefCell::new(ColorPropertyEditor::default()))
        });
        pool
    }

    pub fn register_factory(
        &mut self,
        kind: impl Into<String>,
        factory: impl Fn() -> SharedEditor + 'static,
    ) {
        self.factories.insert(kind.into(), Box::new(factory));
    }

    /// Starts a refresh cycle: every kind's cursor rewinds to its first
    /// pooled instance. Pooled instances are kept.
    pub fn begin_cycle(&mut self) {
        self.counts.clear();
    }

    /// Returns the instance at the current cursor for `kind`, growing the
    /// pool through the kind's factory when the cursor has passed every
    /// pooled instance. Unknown kinds fall back to the text editor factory
    /// but are pooled under the requested kind.
    pub fn acquire(&mut self, kind: &str, property: EditableProperty) -> SharedEditor {
        let count = self.counts.get(kind).copied().unwrap_or(0);
        let editors = self.cached.entry(kind.to_string()).or_default();
        let editor = if count == editors.len() {
            let factory = self
                .factories
                .get(kind)
                .or_else(|| self.factories.get(EDITOR_KIND_TEXT))
                .expect("text editor factory is always registered");
            let editor = factory();
            editors.push(editor.clone());
            editor
        } else {
            editors[count].clone()
        };
        self.counts.insert(kind.to_string(), count + 1);
        editor.borrow_mut().bind(property);
        editor
    }

    /// Number of live instances pooled for `kind`.
    pub fn pooled(&self, kind: &str) -> usize {
        self.cached.get(kind).map(Vec::len).unwrap_or(0)
    }

    /// Instances issued for `kind` in the current cycle.
    pub fn cursor(&self, kind: &str) -> usize {
        self.counts.get(kind).copied().unwrap_or(0)
    }
}

impl Default for PropertyEditorPool {
    fn default() -> Self {
        Self::new()
    }
}
