//! [`Runtime`] implementation backed by Hyprland IPC.
//!
//! Communicates directly with Hyprland through its command socket at
//! `$XDG_RUNTIME_DIR/hypr/$HYPRLAND_INSTANCE_SIGNATURE/.socket.sock`.
//! Groups map onto Hyprland workspaces by name.
//!
//! Descriptor settings are pushed with `/keyword` requests, which Hyprland
//! forgets on its own config reload.  The session re-applies them after
//! every reload.

use super::{socket_path, HyprlandError};
use crate::binding::{MouseAction, MouseBinding};
use crate::command::{
    Chord, LayoutCommand, Modifier, RuntimeCommand, ScreenInfo, SpawnRequest, WindowInfo,
};
use crate::config::FocusOnActivation;
use crate::descriptor::SessionDescriptor;
use crate::layout::LayoutKind;
use crate::spawn::spawn_detached;
use crate::traits::Runtime;
use log::{debug, warn};
use serde::Deserialize;
use std::io::{Read, Write};
use std::os::unix::net::UnixStream;

/// Pixels added or removed by one grow step.
const GROW_STEP: i32 = 40;

/// How long notifications stay on screen, in milliseconds.
const NOTIFY_MS: u32 = 5000;

/// Hyprland-backed runtime.
///
/// No connection is kept open; each call makes a short-lived IPC request.
#[derive(Debug, Default)]
pub struct HyprlandRuntime;

impl HyprlandRuntime {
    pub fn new() -> Self {
        Self
    }
}

//  Direct Hyprland IPC helpers

/// Send a raw command to the command socket and return the response.
fn ipc_request(command: &str) -> Result<String, HyprlandError> {
    let path = socket_path(".socket.sock")?;
    let mut stream = UnixStream::connect(&path)
        .map_err(|e| HyprlandError(format!("connect to {}: {}", path.display(), e)))?;

    stream
        .write_all(command.as_bytes())
        .map_err(|e| HyprlandError(format!("write: {}", e)))?;

    let mut response = Vec::new();
    stream
        .read_to_end(&mut response)
        .map_err(|e| HyprlandError(format!("read: {}", e)))?;

    String::from_utf8(response).map_err(|e| HyprlandError(format!("utf-8: {}", e)))
}

/// Send a JSON data query (`j/<command>`) and decode the answer.
fn ipc_json<T: for<'de> Deserialize<'de>>(data_command: &str) -> Result<T, HyprlandError> {
    let json = ipc_request(&format!("j/{}", data_command))?;
    serde_json::from_str(&json).map_err(|e| HyprlandError(format!("parse {}: {}", data_command, e)))
}

/// Send a request and check for `"ok"`.
fn ipc_ok(request: &str) -> Result<(), HyprlandError> {
    let response = ipc_request(request)?;
    if response.trim() == "ok" {
        Ok(())
    } else {
        Err(HyprlandError(format!("{}: {}", request, response.trim())))
    }
}

//  Minimal serde structs for the JSON we care about

#[derive(Deserialize)]
struct WorkspaceRef {
    name: String,
}

/// Subset of the JSON object returned by `j/monitors`.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct MonitorJson {
    name: String,
    #[serde(default)]
    focused: bool,
    active_workspace: Option<WorkspaceRef>,
}

/// Subset of the JSON object returned by `j/clients` and `j/activewindow`.
///
/// `j/activewindow` answers `{}` when nothing has focus.
#[derive(Deserialize)]
struct ClientJson {
    #[serde(default)]
    address: String,
    #[serde(default)]
    class: String,
    #[serde(default)]
    title: String,
    #[serde(default)]
    floating: bool,
    workspace: Option<WorkspaceRef>,
}

fn screens_from(monitors: Vec<MonitorJson>) -> Vec<ScreenInfo> {
    monitors
        .into_iter()
        .enumerate()
        .map(|(index, m)| ScreenInfo {
            index,
            name: m.name,
            group: m.active_workspace.map(|w| w.name),
            focused: m.focused,
        })
        .collect()
}

fn windows_from(clients: Vec<ClientJson>) -> Vec<WindowInfo> {
    clients
        .into_iter()
        .filter(|c| !c.address.is_empty())
        .map(|c| WindowInfo {
            address: c.address,
            class: c.class,
            title: c.title,
            floating: c.floating,
            group: c.workspace.map(|w| w.name),
            ..WindowInfo::default()
        })
        .collect()
}

//  Command translation

/// Numeric groups are addressed by id, everything else by name.
fn workspace(group: &str) -> String {
    if group.parse::<i64>().is_ok() {
        group.to_string()
    } else {
        format!("name:{}", group)
    }
}

fn layout_dispatch(cmd: LayoutCommand) -> String {
    use LayoutCommand::*;
    match cmd {
        Left => "movefocus l".into(),
        Right => "movefocus r".into(),
        Up => "movefocus u".into(),
        Down => "movefocus d".into(),
        ShuffleLeft => "movewindow l".into(),
        ShuffleRight => "movewindow r".into(),
        ShuffleUp => "movewindow u".into(),
        ShuffleDown => "movewindow d".into(),
        GrowLeft => format!("resizeactive -{} 0", GROW_STEP),
        GrowRight => format!("resizeactive {} 0", GROW_STEP),
        GrowUp => format!("resizeactive 0 -{}", GROW_STEP),
        GrowDown => format!("resizeactive 0 {}", GROW_STEP),
        Next => "cyclenext".into(),
        Normalize => "splitratio exact 1".into(),
    }
}

/// Translate `command` into a raw request for the command socket.
fn request_for(command: &RuntimeCommand) -> Result<String, HyprlandError> {
    let dispatch = match command {
        RuntimeCommand::Layout(cmd) => layout_dispatch(*cmd),
        RuntimeCommand::NextLayout => {
            return Err(HyprlandError(
                "next_layout: hyprland has no runtime layout cycling".into(),
            ))
        }
        RuntimeCommand::SetLayout(kind) => {
            return Ok(format!("/keyword general:layout {}", hyprland_layout(*kind)?))
        }
        RuntimeCommand::KillWindow => "killactive".into(),
        RuntimeCommand::ToggleFloating => "togglefloating".into(),
        RuntimeCommand::BringToFront => "bringactivetotop".into(),
        RuntimeCommand::RaiseWindow(address) => format!("alterzorder top,address:{}", address),
        RuntimeCommand::FloatWindow(address) => format!("setfloating address:{}", address),
        RuntimeCommand::ToGroup(group) => {
            format!("focusworkspaceoncurrentmonitor {}", workspace(group))
        }
        RuntimeCommand::WindowToGroup(group) => {
            format!("movetoworkspacesilent {}", workspace(group))
        }
        RuntimeCommand::MoveWindowToGroup { window, group } => {
            format!("movetoworkspacesilent {},address:{}", workspace(group), window)
        }
        RuntimeCommand::ReloadConfig => return Ok("/reload".into()),
        RuntimeCommand::Shutdown => "exit".into(),
        RuntimeCommand::Runtime { name, args } if args.is_empty() => name.clone(),
        RuntimeCommand::Runtime { name, args } => format!("{} {}", name, args.join(" ")),
    };
    Ok(format!("/dispatch {}", dispatch))
}

/// Hyprland's closest tiling layout.  It only has `dwindle` and `master`;
/// stacked and maximised layouts use `master`.
fn hyprland_layout(kind: LayoutKind) -> Result<&'static str, HyprlandError> {
    match kind {
        LayoutKind::Bsp => Ok("dwindle"),
        LayoutKind::Max | LayoutKind::Columns | LayoutKind::Stack | LayoutKind::MonadTall => {
            Ok("master")
        }
        LayoutKind::Floating => Err(HyprlandError(
            "floating: hyprland has no floating layout".into(),
        )),
    }
}

//  Descriptor settings

fn modifier_name(m: Modifier) -> &'static str {
    match m {
        Modifier::Shift => "SHIFT",
        Modifier::Lock => "CAPS",
        Modifier::Control => "CTRL",
        Modifier::Mod1 => "ALT",
        Modifier::Mod2 => "MOD2",
        Modifier::Mod3 => "MOD3",
        Modifier::Mod4 => "SUPER",
        Modifier::Mod5 => "MOD5",
    }
}

/// `MODS,mouse:CODE` for a pointer chord.  Buttons 2 and 3 swap codes
/// because evdev numbers the right button before the middle one.
fn mouse_key(chord: &Chord) -> Option<String> {
    let code = match chord.key() {
        "button1" => 272,
        "button2" => 274,
        "button3" => 273,
        _ => return None,
    };
    let mods: Vec<&str> = chord.modifiers().iter().map(|&m| modifier_name(m)).collect();
    Some(format!("{},mouse:{}", mods.join(" "), code))
}

fn mouse_requests(binding: &MouseBinding) -> Option<[String; 2]> {
    let Some(key) = mouse_key(&binding.chord) else {
        warn!("{}: hyprland cannot bind this button", binding.chord);
        return None;
    };
    let dispatcher = match binding.action {
        MouseAction::MoveFloating => "movewindow",
        MouseAction::ResizeFloating => "resizewindow",
        MouseAction::BringToFront => "bringactivetotop",
    };
    // Drags need `bindm` so Hyprland tracks the pointer while held.
    let bind = if binding.action.is_drag() { "bindm" } else { "bind" };
    // Unbinding first keeps repeated applies from stacking duplicates.
    Some([
        format!("/keyword unbind {}", key),
        format!("/keyword {} {},{}", bind, key, dispatcher),
    ])
}

fn bool_value(b: bool) -> &'static str {
    if b {
        "true"
    } else {
        "false"
    }
}

/// The `/keyword` requests that push `descriptor` into Hyprland.
fn keyword_requests(descriptor: &SessionDescriptor) -> Vec<String> {
    let mut requests = Vec::new();
    if let Some(layout) = descriptor.layouts.first() {
        let theme = &layout.theme;
        requests.extend([
            format!("/keyword general:gaps_in {}", theme.margin),
            format!("/keyword general:gaps_out {}", theme.margin),
            format!("/keyword general:border_size {}", theme.border_width),
            format!("/keyword general:col.active_border rgb({})", theme.border_focus.hex()),
            format!("/keyword general:col.inactive_border rgb({})", theme.border_normal.hex()),
            format!("/keyword group:col.border_active rgb({})", theme.border_focus_stack.hex()),
        ]);
    }

    let floating = &descriptor.floating;
    requests.extend([
        format!(
            "/keyword windowrulev2 bordercolor rgb({}),floating:1",
            floating.border_focus.hex()
        ),
        format!("/keyword windowrulev2 bordersize {},floating:1", floating.border_width),
    ]);

    let flags = &descriptor.flags;
    let focus_on_activate = matches!(
        flags.focus_on_window_activation,
        FocusOnActivation::Smart | FocusOnActivation::Focus
    );
    requests.extend([
        format!("/keyword input:follow_mouse {}", u8::from(flags.follow_mouse_focus)),
        format!("/keyword cursor:no_warps {}", bool_value(!flags.cursor_warp)),
        format!("/keyword misc:focus_on_activate {}", bool_value(focus_on_activate)),
    ]);

    requests.extend(descriptor.mouse.iter().filter_map(mouse_requests).flatten());
    requests
}

//  Runtime implementation

impl Runtime for HyprlandRuntime {
    type Error = HyprlandError;

    fn screens(&self) -> Result<Vec<ScreenInfo>, Self::Error> {
        Ok(screens_from(ipc_json("monitors")?))
    }

    fn windows(&self) -> Result<Vec<WindowInfo>, Self::Error> {
        Ok(windows_from(ipc_json("clients")?))
    }

    fn focused_window(&self) -> Result<Option<WindowInfo>, Self::Error> {
        Ok(windows_from(vec![ipc_json("activewindow")?]).pop())
    }

    /// Send every keyword request, reporting the ones Hyprland refused.
    fn apply(&self, descriptor: &SessionDescriptor) -> Result<(), Self::Error> {
        let refused: Vec<String> = keyword_requests(descriptor)
            .iter()
            .filter_map(|request| ipc_ok(request).err())
            .map(|e| e.to_string())
            .collect();
        if refused.is_empty() {
            Ok(())
        } else {
            Err(HyprlandError(refused.join("; ")))
        }
    }

    fn execute(&self, command: &RuntimeCommand) -> Result<(), Self::Error> {
        let request = request_for(command)?;
        debug!("{} -> {}", command, request);
        ipc_ok(&request)
    }

    fn spawn(&self, request: &SpawnRequest) -> Result<(), Self::Error> {
        spawn_detached(request).map_err(|e| HyprlandError(e.to_string()))
    }

    fn notify(&self, message: &str) -> Result<(), Self::Error> {
        // icon 3 is "info"; color 0 keeps the default.
        ipc_ok(&format!("/notify 3 {} 0 {}", NOTIFY_MS, message))
    }
}
