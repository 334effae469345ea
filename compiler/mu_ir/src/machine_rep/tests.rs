use super::*;

#[test]
fn test_sizes() {
    assert_eq!(MachineRep::Void.size(), 0);
    assert_eq!(MachineRep::Bool.size(), 1);
    assert_eq!(MachineRep::Short.size(), 2);
    assert_eq!(MachineRep::Char.size(), 4);
    assert_eq!(MachineRep::Double.size(), 8);
    assert_eq!(MachineRep::Pointer.size(), 8);
}

#[test]
fn test_alignment() {
    assert_eq!(MachineRep::Void.struct_alignment(), 1);
    assert_eq!(MachineRep::Int64.struct_alignment(), 8);
    assert_eq!(MachineRep::Void.natural_alignment(), 0);
}

#[test]
fn test_align_up() {
    assert_eq!(align_up(0, 8), 0);
    assert_eq!(align_up(1, 8), 8);
    assert_eq!(align_up(9, 4), 12);
    assert_eq!(align_up(5, 1), 5);
    assert_eq!(align_up(5, 0), 5);
}

#[test]
fn test_classification() {
    assert!(MachineRep::Pointer.is_pointer());
    assert!(!MachineRep::Int.is_pointer());
    assert!(MachineRep::Char.is_integral());
    assert!(MachineRep::Float.is_floating());
    assert_eq!(MachineRep::Int64.to_string(), "int64");
}
