// Physical key state query (CoreGraphics)

/// `kCGEventSourceStateHIDSystemState`: the aggregate hardware state, as
/// opposed to the per-session event state our own injections feed.
const HID_SYSTEM_STATE: i32 = 1;

#[cfg_attr(target_os = "macos", link(name = "CoreGraphics", kind = "framework"))]
unsafe extern "C" {
    fn CGEventSourceKeyState(state_id: i32, key: u16) -> bool;
}

/// Whether the hardware key with `code` is currently held down.
pub(crate) fn hid_key_down(code: u16) -> bool {
    unsafe { CGEventSourceKeyState(HID_SYSTEM_STATE, code) }
}
