/*!
Stop code names.

The table below is sorted by code so lookups can use a binary search. Codes missing from the
table are still valid data and are named `UNKNOWN_0x<HEX>`.
*/

use std::fmt;

#[rustfmt::skip]
static BUG_CHECK_NAMES: &[(u32, &str)] = &[
    (0x0000_0001, "APC_INDEX_MISMATCH"),
    (0x0000_0002, "DEVICE_QUEUE_NOT_BUSY"),
    (0x0000_0003, "INVALID_AFFINITY_SET"),
    (0x0000_0004, "INVALID_DATA_ACCESS_TRAP"),
    (0x0000_0005, "INVALID_PROCESS_ATTACH_ATTEMPT"),
    (0x0000_0006, "INVALID_PROCESS_DETACH_ATTEMPT"),
    (0x0000_0007, "INVALID_SOFTWARE_INTERRUPT"),
    (0x0000_0008, "IRQL_NOT_DISPATCH_LEVEL"),
    (0x0000_0009, "IRQL_NOT_GREATER_OR_EQUAL"),
    (0x0000_000A, "IRQL_NOT_LESS_OR_EQUAL"),
    (0x0000_000B, "NO_EXCEPTION_HANDLING_SUPPORT"),
    (0x0000_000C, "MAXIMUM_WAIT_OBJECTS_EXCEEDED"),
    (0x0000_000D, "MUTEX_LEVEL_NUMBER_VIOLATION"),
    (0x0000_000E, "NO_USER_MODE_CONTEXT"),
    (0x0000_000F, "SPIN_LOCK_ALREADY_OWNED"),
    (0x0000_0010, "SPIN_LOCK_NOT_OWNED"),
    (0x0000_0011, "THREAD_NOT_MUTEX_OWNER"),
    (0x0000_0012, "TRAP_CAUSE_UNKNOWN"),
    (0x0000_0013, "EMPTY_THREAD_REAPER_LIST"),
    (0x0000_0014, "CREATE_DELETE_LOCK_NOT_LOCKED"),
    (0x0000_0015, "LAST_CHANCE_CALLED_FROM_KMODE"),
    (0x0000_0016, "CID_HANDLE_CREATION"),
    (0x0000_0017, "CID_HANDLE_DELETION"),
    (0x0000_0018, "REFERENCE_BY_POINTER"),
    (0x0000_0019, "BAD_POOL_HEADER"),
    (0x0000_001A, "MEMORY_MANAGEMENT"),
    (0x0000_001B, "PFN_SHARE_COUNT"),
    (0x0000_001C, "PFN_REFERENCE_COUNT"),
    (0x0000_001D, "NO_SPIN_LOCK_AVAILABLE"),
    (0x0000_001E, "KMODE_EXCEPTION_NOT_HANDLED"),
    (0x0000_001F, "SHARED_RESOURCE_CONV_ERROR"),
    (0x0000_0020, "KERNEL_APC_PENDING_DURING_EXIT"),
    (0x0000_0021, "QUOTA_UNDERFLOW"),
    (0x0000_0022, "FILE_SYSTEM"),
    (0x0000_0023, "FAT_FILE_SYSTEM"),
    (0x0000_0024, "NTFS_FILE_SYSTEM"),
    (0x0000_0025, "NPFS_FILE_SYSTEM"),
    (0x0000_0026, "CDFS_FILE_SYSTEM"),
    (0x0000_0027, "RDR_FILE_SYSTEM"),
    (0x0000_0028, "CORRUPT_ACCESS_TOKEN"),
    (0x0000_0029, "SECURITY_SYSTEM"),
    (0x0000_002A, "INCONSISTENT_IRP"),
    (0x0000_002B, "PANIC_STACK_SWITCH"),
    (0x0000_002C, "PORT_DRIVER_INTERNAL"),
    (0x0000_002D, "SCSI_DISK_DRIVER_INTERNAL"),
    (0x0000_002E, "DATA_BUS_ERROR"),
    (0x0000_002F, "INSTRUCTION_BUS_ERROR"),
    (0x0000_0030, "SET_OF_INVALID_CONTEXT"),
    (0x0000_0031, "PHASE0_INITIALIZATION_FAILED"),
    (0x0000_0032, "PHASE1_INITIALIZATION_FAILED"),
    (0x0000_0033, "UNEXPECTED_INITIALIZATION_CALL"),
    (0x0000_0034, "CACHE_MANAGER"),
    (0x0000_0035, "NO_MORE_IRP_STACK_LOCATIONS"),
    (0x0000_0036, "DEVICE_REFERENCE_COUNT_NOT_ZERO"),
    (0x0000_0037, "FLOPPY_INTERNAL_ERROR"),
    (0x0000_0038, "SERIAL_DRIVER_INTERNAL"),
    (0x0000_0039, "SYSTEM_EXIT_OWNED_MUTEX"),
    (0x0000_003A, "SYSTEM_UNWIND_PREVIOUS_USER"),
    (0x0000_003B, "SYSTEM_SERVICE_EXCEPTION"),
    (0x0000_003C, "INTERRUPT_UNWIND_ATTEMPTED"),
    (0x0000_003D, "INTERRUPT_EXCEPTION_NOT_HANDLED"),
    (0x0000_003E, "MULTIPROCESSOR_CONFIGURATION_NOT_SUPPORTED"),
    (0x0000_003F, "NO_MORE_SYSTEM_PTES"),
    (0x0000_0040, "TARGET_MDL_TOO_SMALL"),
    (0x0000_0041, "MUST_SUCCEED_POOL_EMPTY"),
    (0x0000_0042, "ATDISK_DRIVER_INTERNAL"),
    (0x0000_0043, "NO_SUCH_PARTITION"),
    (0x0000_0044, "MULTIPLE_IRP_COMPLETE_REQUESTS"),
    (0x0000_0045, "INSUFFICIENT_SYSTEM_MAP_REGS"),
    (0x0000_0046, "DEREF_UNKNOWN_LOGON_SESSION"),
    (0x0000_0047, "REF_UNKNOWN_LOGON_SESSION"),
    (0x0000_0048, "CANCEL_STATE_IN_COMPLETED_IRP"),
    (0x0000_0049, "PAGE_FAULT_WITH_INTERRUPTS_OFF"),
    (0x0000_004A, "IRQL_GT_ZERO_AT_SYSTEM_SERVICE"),
    (0x0000_004B, "STREAMS_INTERNAL_ERROR"),
    (0x0000_004C, "FATAL_UNHANDLED_HARD_ERROR"),
    (0x0000_004D, "NO_PAGES_AVAILABLE"),
    (0x0000_004E, "PFN_LIST_CORRUPT"),
    (0x0000_004F, "NDIS_INTERNAL_ERROR"),
    (0x0000_0050, "PAGE_FAULT_IN_NONPAGED_AREA"),
    (0x0000_0051, "REGISTRY_ERROR"),
    (0x0000_0052, "MAILSLOT_FILE_SYSTEM"),
    (0x0000_0053, "NO_BOOT_DEVICE"),
    (0x0000_0054, "LM_SERVER_INTERNAL_ERROR"),
    (0x0000_0055, "DATA_COHERENCY_EXCEPTION"),
    (0x0000_0056, "INSTRUCTION_COHERENCY_EXCEPTION"),
    (0x0000_0057, "XNS_INTERNAL_ERROR"),
    (0x0000_0058, "FTDISK_INTERNAL_ERROR"),
    (0x0000_0059, "PINBALL_FILE_SYSTEM"),
    (0x0000_005A, "CRITICAL_SERVICE_FAILED"),
    (0x0000_005B, "SET_ENV_VAR_FAILED"),
    (0x0000_005C, "HAL_INITIALIZATION_FAILED"),
    (0x0000_005D, "UNSUPPORTED_PROCESSOR"),
    (0x0000_005E, "OBJECT_INITIALIZATION_FAILED"),
    (0x0000_005F, "SECURITY_INITIALIZATION_FAILED"),
    (0x0000_0060, "PROCESS_INITIALIZATION_FAILED"),
    (0x0000_0061, "HAL1_INITIALIZATION_FAILED"),
    (0x0000_0062, "OBJECT1_INITIALIZATION_FAILED"),
    (0x0000_0063, "SECURITY1_INITIALIZATION_FAILED"),
    (0x0000_0064, "SYMBOLIC_INITIALIZATION_FAILED"),
    (0x0000_0065, "MEMORY1_INITIALIZATION_FAILED"),
    (0x0000_0066, "CACHE_INITIALIZATION_FAILED"),
    (0x0000_0067, "CONFIG_INITIALIZATION_FAILED"),
    (0x0000_0068, "FILE_INITIALIZATION_FAILED"),
    (0x0000_0069, "IO1_INITIALIZATION_FAILED"),
    (0x0000_006A, "LPC_INITIALIZATION_FAILED"),
    (0x0000_006B, "PROCESS1_INITIALIZATION_FAILED"),
    (0x0000_006C, "REFMON_INITIALIZATION_FAILED"),
    (0x0000_006D, "SESSION1_INITIALIZATION_FAILED"),
    (0x0000_006E, "SESSION2_INITIALIZATION_FAILED"),
    (0x0000_006F, "SESSION3_INITIALIZATION_FAILED"),
    (0x0000_0070, "SESSION4_INITIALIZATION_FAILED"),
    (0x0000_0071, "SESSION5_INITIALIZATION_FAILED"),
    (0x0000_0072, "ASSIGN_DRIVE_LETTERS_FAILED"),
    (0x0000_0073, "CONFIG_LIST_FAILED"),
    (0x0000_0074, "BAD_SYSTEM_CONFIG_INFO"),
    (0x0000_0075, "CANNOT_WRITE_CONFIGURATION"),
    (0x0000_0076, "PROCESS_HAS_LOCKED_PAGES"),
    (0x0000_0077, "KERNEL_STACK_INPAGE_ERROR"),
    (0x0000_0078, "PHASE0_EXCEPTION"),
    (0x0000_0079, "MISMATCHED_HAL"),
    (0x0000_007A, "KERNEL_DATA_INPAGE_ERROR"),
    (0x0000_007B, "INACCESSIBLE_BOOT_DEVICE"),
    (0x0000_007C, "BUGCODE_NDIS_DRIVER"),
    (0x0000_007D, "INSTALL_MORE_MEMORY"),
    (0x0000_007E, "SYSTEM_THREAD_EXCEPTION_NOT_HANDLED"),
    (0x0000_007F, "UNEXPECTED_KERNEL_MODE_TRAP"),
    (0x0000_0080, "NMI_HARDWARE_FAILURE"),
    (0x0000_0081, "SPIN_LOCK_INIT_FAILURE"),
    (0x0000_0082, "DFS_FILE_SYSTEM"),
    (0x0000_0085, "SETUP_FAILURE"),
    (0x0000_008B, "MBR_CHECKSUM_MISMATCH"),
    (0x0000_008E, "KERNEL_MODE_EXCEPTION_NOT_HANDLED"),
    (0x0000_008F, "PP0_INITIALIZATION_FAILED"),
    (0x0000_0090, "PP1_INITIALIZATION_FAILED"),
    (0x0000_0092, "UP_DRIVER_ON_MP_SYSTEM"),
    (0x0000_0093, "INVALID_KERNEL_HANDLE"),
    (0x0000_0094, "KERNEL_STACK_LOCKED_AT_EXIT"),
    (0x0000_0096, "INVALID_WORK_QUEUE_ITEM"),
    (0x0000_0097, "BOUND_IMAGE_UNSUPPORTED"),
    (0x0000_0098, "END_OF_NT_EVALUATION_PERIOD"),
    (0x0000_0099, "INVALID_REGION_OR_SEGMENT"),
    (0x0000_009A, "SYSTEM_LICENSE_VIOLATION"),
    (0x0000_009B, "UDFS_FILE_SYSTEM"),
    (0x0000_009C, "MACHINE_CHECK_EXCEPTION"),
    (0x0000_009E, "USER_MODE_HEALTH_MONITOR"),
    (0x0000_009F, "DRIVER_POWER_STATE_FAILURE"),
    (0x0000_00A0, "INTERNAL_POWER_ERROR"),
    (0x0000_00A1, "PCI_BUS_DRIVER_INTERNAL"),
    (0x0000_00A2, "MEMORY_IMAGE_CORRUPT"),
    (0x0000_00A3, "ACPI_DRIVER_INTERNAL"),
    (0x0000_00A4, "CNSS_FILE_SYSTEM_FILTER"),
    (0x0000_00A5, "ACPI_BIOS_ERROR"),
    (0x0000_00A7, "BAD_EXHANDLE"),
    (0x0000_00AB, "SESSION_HAS_VALID_POOL_ON_EXIT"),
    (0x0000_00AC, "HAL_MEMORY_ALLOCATION"),
    (0x0000_00AD, "VIDEO_DRIVER_DEBUG_REPORT_REQUEST"),
    (0x0000_00B1, "BGI_DETECTED_VIOLATION"),
    (0x0000_00B4, "VIDEO_DRIVER_INIT_FAILURE"),
    (0x0000_00B8, "ATTEMPTED_SWITCH_FROM_DPC"),
    (0x0000_00B9, "CHIPSET_DETECTED_ERROR"),
    (0x0000_00BA, "SESSION_HAS_VALID_VIEWS_ON_EXIT"),
    (0x0000_00BB, "NETWORK_BOOT_INITIALIZATION_FAILED"),
    (0x0000_00BC, "NETWORK_BOOT_DUPLICATE_ADDRESS"),
    (0x0000_00BD, "INVALID_HIBERNATED_STATE"),
    (0x0000_00BE, "ATTEMPTED_WRITE_TO_READONLY_MEMORY"),
    (0x0000_00BF, "MUTEX_ALREADY_OWNED"),
    (0x0000_00C1, "SPECIAL_POOL_DETECTED_MEMORY_CORRUPTION"),
    (0x0000_00C2, "BAD_POOL_CALLER"),
    (0x0000_00C4, "DRIVER_VERIFIER_DETECTED_VIOLATION"),
    (0x0000_00C5, "DRIVER_CORRUPTED_EXPOOL"),
    (0x0000_00C6, "DRIVER_CAUGHT_MODIFYING_FREED_POOL"),
    (0x0000_00C7, "TIMER_OR_DPC_INVALID"),
    (0x0000_00C8, "IRQL_UNEXPECTED_VALUE"),
    (0x0000_00C9, "DRIVER_VERIFIER_IOMANAGER_VIOLATION"),
    (0x0000_00CA, "PNP_DETECTED_FATAL_ERROR"),
    (0x0000_00CB, "DRIVER_LEFT_LOCKED_PAGES_IN_PROCESS"),
    (0x0000_00CC, "PAGE_FAULT_IN_FREED_SPECIAL_POOL"),
    (0x0000_00CD, "PAGE_FAULT_BEYOND_END_OF_ALLOCATION"),
    (0x0000_00CE, "DRIVER_UNLOADED_WITHOUT_CANCELLING_PENDING_OPERATIONS"),
    (0x0000_00CF, "TERMINAL_SERVER_DRIVER_MADE_INCORRECT_MEMORY_REFERENCE"),
    (0x0000_00D0, "DRIVER_CORRUPTED_MMPOOL"),
    (0x0000_00D1, "DRIVER_IRQL_NOT_LESS_OR_EQUAL"),
    (0x0000_00D2, "BUGCODE_ID_DRIVER"),
    (0x0000_00D3, "DRIVER_PORTION_MUST_BE_NONPAGED"),
    (0x0000_00D4, "SYSTEM_SCAN_AT_RAISED_IRQL_CAUGHT_IMPROPER_DRIVER_UNLOAD"),
    (0x0000_00D5, "DRIVER_PAGE_FAULT_IN_FREED_SPECIAL_POOL"),
    (0x0000_00D6, "DRIVER_PAGE_FAULT_BEYOND_END_OF_ALLOCATION"),
    (0x0000_00D7, "DRIVER_UNMAPPING_INVALID_VIEW"),
    (0x0000_00D8, "DRIVER_USED_EXCESSIVE_PTES"),
    (0x0000_00D9, "LOCKED_PAGES_TRACKER_CORRUPTION"),
    (0x0000_00DA, "SYSTEM_PTE_MISUSE"),
    (0x0000_00DB, "DRIVER_CORRUPTED_SYSPTES"),
    (0x0000_00DC, "DRIVER_INVALID_STACK_ACCESS"),
    (0x0000_00DE, "POOL_CORRUPTION_IN_FILE_AREA"),
    (0x0000_00DF, "IMPERSONATING_WORKER_THREAD"),
    (0x0000_00E0, "ACPI_BIOS_FATAL_ERROR"),
    (0x0000_00E1, "WORKER_THREAD_RETURNED_AT_BAD_IRQL"),
    (0x0000_00E2, "MANUALLY_INITIATED_CRASH"),
    (0x0000_00E3, "RESOURCE_NOT_OWNED"),
    (0x0000_00E4, "WORKER_INVALID"),
    (0x0000_00E6, "DRIVER_VERIFIER_DMA_VIOLATION"),
    (0x0000_00E7, "INVALID_FLOATING_POINT_STATE"),
    (0x0000_00E8, "INVALID_CANCEL_OF_FILE_OPEN"),
    (0x0000_00E9, "ACTIVE_EX_WORKER_THREAD_TERMINATION"),
    (0x0000_00EA, "THREAD_STUCK_IN_DEVICE_DRIVER"),
    (0x0000_00EB, "DIRTY_MAPPED_PAGES_CONGESTION"),
    (0x0000_00EC, "SESSION_HAS_VALID_SPECIAL_POOL_ON_EXIT"),
    (0x0000_00ED, "UNMOUNTABLE_BOOT_VOLUME"),
    (0x0000_00EF, "CRITICAL_PROCESS_DIED"),
    (0x0000_00F0, "STORAGE_MINIPORT_ERROR"),
    (0x0000_00F1, "SCSI_VERIFIER_DETECTED_VIOLATION"),
    (0x0000_00F2, "HARDWARE_INTERRUPT_STORM"),
    (0x0000_00F3, "DISORDERLY_SHUTDOWN"),
    (0x0000_00F4, "CRITICAL_OBJECT_TERMINATION"),
    (0x0000_00F5, "FLTMGR_FILE_SYSTEM"),
    (0x0000_00F6, "PCI_VERIFIER_DETECTED_VIOLATION"),
    (0x0000_00F7, "DRIVER_OVERRAN_STACK_BUFFER"),
    (0x0000_00F8, "RAMDISK_BOOT_INITIALIZATION_FAILED"),
    (0x0000_00F9, "DRIVER_RETURNED_STATUS_REPARSE_FOR_VOLUME_OPEN"),
    (0x0000_00FA, "HTTP_DRIVER_CORRUPTED"),
    (0x0000_00FC, "ATTEMPTED_EXECUTE_OF_NOEXECUTE_MEMORY"),
    (0x0000_00FD, "DIRTY_NOWRITE_PAGES_CONGESTION"),
    (0x0000_00FE, "BUGCODE_USB_DRIVER"),
    (0x0000_00FF, "RESERVE_QUEUE_OVERFLOW"),
    (0x0000_0100, "LOADER_BLOCK_MISMATCH"),
    (0x0000_0101, "CLOCK_WATCHDOG_TIMEOUT"),
    (0x0000_0102, "DPC_WATCHDOG_TIMEOUT"),
    (0x0000_0103, "MUP_FILE_SYSTEM"),
    (0x0000_0104, "AGP_INVALID_ACCESS"),
    (0x0000_0105, "AGP_GART_CORRUPTION"),
    (0x0000_0106, "AGP_ILLEGALLY_REPROGRAMMED"),
    (0x0000_0108, "THIRD_PARTY_FILE_SYSTEM_FAILURE"),
    (0x0000_0109, "CRITICAL_STRUCTURE_CORRUPTION"),
    (0x0000_010A, "APP_TAGGING_INITIALIZATION_FAILED"),
    (0x0000_010C, "FSRTL_EXTRA_CREATE_PARAMETER_VIOLATION"),
    (0x0000_010D, "WDF_VIOLATION"),
    (0x0000_010E, "VIDEO_MEMORY_MANAGEMENT_INTERNAL"),
    (0x0000_010F, "RESOURCE_MANAGER_EXCEPTION_NOT_HANDLED"),
    (0x0000_0111, "RECURSIVE_NMI"),
    (0x0000_0112, "MSRPC_STATE_VIOLATION"),
    (0x0000_0113, "VIDEO_DXGKRNL_FATAL_ERROR"),
    (0x0000_0114, "VIDEO_SHADOW_DRIVER_FATAL_ERROR"),
    (0x0000_0115, "AGP_INTERNAL"),
    (0x0000_0116, "VIDEO_TDR_FAILURE"),
    (0x0000_0117, "VIDEO_TDR_TIMEOUT_DETECTED"),
    (0x0000_0119, "VIDEO_SCHEDULER_INTERNAL_ERROR"),
    (0x0000_011A, "EM_INITIALIZATION_FAILURE"),
    (0x0000_011B, "DRIVER_RETURNED_HOLDING_CANCEL_LOCK"),
    (0x0000_011C, "ATTEMPTED_WRITE_TO_CM_PROTECTED_STORAGE"),
    (0x0000_011D, "EVENT_TRACING_FATAL_ERROR"),
    (0x0000_011E, "TOO_MANY_RECURSIVE_FAULTS"),
    (0x0000_011F, "INVALID_DRIVER_HANDLE"),
    (0x0000_0120, "BITLOCKER_FATAL_ERROR"),
    (0x0000_0121, "DRIVER_VIOLATION"),
    (0x0000_0122, "WHEA_INTERNAL_ERROR"),
    (0x0000_0123, "CRYPTO_SELF_TEST_FAILURE"),
    (0x0000_0124, "WHEA_UNCORRECTABLE_ERROR"),
    (0x0000_0125, "NMR_INVALID_STATE"),
    (0x0000_0126, "NETIO_INVALID_POOL_CALLER"),
    (0x0000_0127, "PAGE_NOT_ZERO"),
    (0x0000_0128, "WORKER_THREAD_RETURNED_WITH_BAD_IO_PRIORITY"),
    (0x0000_0129, "WORKER_THREAD_RETURNED_WITH_BAD_PAGING_IO_PRIORITY"),
    (0x0000_012A, "MUI_NO_VALID_SYSTEM_LANGUAGE"),
    (0x0000_012B, "FAULTY_HARDWARE_CORRUPTED_PAGE"),
    (0x0000_012C, "EXFAT_FILE_SYSTEM"),
    (0x0000_012D, "VOLSNAP_OVERLAPPED_TABLE_ACCESS"),
    (0x0000_012E, "INVALID_MDL_RANGE"),
    (0x0000_012F, "VHD_BOOT_INITIALIZATION_FAILED"),
    (0x0000_0130, "DYNAMIC_ADD_PROCESSOR_MISMATCH"),
    (0x0000_0131, "INVALID_EXTENDED_PROCESSOR_STATE"),
    (0x0000_0132, "RESOURCE_OWNER_POINTER_INVALID"),
    (0x0000_0133, "DPC_WATCHDOG_VIOLATION"),
    (0x0000_0134, "DRIVE_EXTENDER"),
    (0x0000_0135, "REGISTRY_FILTER_DRIVER_EXCEPTION"),
    (0x0000_0136, "VHD_BOOT_HOST_VOLUME_NOT_ENOUGH_SPACE"),
    (0x0000_0137, "WIN32K_HANDLE_MANAGER"),
    (0x0000_0138, "GPIO_CONTROLLER_DRIVER_ERROR"),
    (0x0000_0139, "KERNEL_SECURITY_CHECK_FAILURE"),
    (0x0000_013A, "KERNEL_MODE_HEAP_CORRUPTION"),
    (0x0000_013B, "PASSIVE_INTERRUPT_ERROR"),
    (0x0000_013C, "INVALID_IO_BOOST_STATE"),
    (0x0000_013D, "CRITICAL_INITIALIZATION_FAILURE"),
    (0x0000_0140, "STORAGE_DEVICE_ABNORMALITY_DETECTED"),
    (0x0000_0143, "PROCESSOR_DRIVER_INTERNAL"),
    (0x0000_0144, "BUGCODE_USB3_DRIVER"),
    (0x0000_0145, "SECURE_BOOT_VIOLATION"),
    (0x0000_0147, "ABNORMAL_RESET_DETECTED"),
    (0x0000_0149, "REFS_FILE_SYSTEM"),
    (0x0000_014A, "KERNEL_WMI_INTERNAL"),
    (0x0000_014B, "SOC_SUBSYSTEM_FAILURE"),
    (0x0000_014C, "FATAL_ABNORMAL_RESET_ERROR"),
    (0x0000_014D, "EXCEPTION_SCOPE_INVALID"),
    (0x0000_014E, "SOC_CRITICAL_DEVICE_REMOVED"),
    (0x0000_014F, "PDC_WATCHDOG_TIMEOUT"),
    (0x0000_0150, "TCPIP_AOAC_NIC_ACTIVE_REFERENCE_LEAK"),
    (0x0000_0151, "UNSUPPORTED_INSTRUCTION_MODE"),
    (0x0000_0152, "INVALID_PUSH_LOCK_FLAGS"),
    (0x0000_0153, "KERNEL_LOCK_ENTRY_LEAKED_ON_THREAD_TERMINATION"),
    (0x0000_0154, "UNEXPECTED_STORE_EXCEPTION"),
    (0x0000_0155, "OS_DATA_TAMPERING"),
    (0x0000_0157, "KERNEL_THREAD_PRIORITY_FLOOR_VIOLATION"),
    (0x0000_0158, "ILLEGAL_IOMMU_PAGE_FAULT"),
    (0x0000_0159, "HAL_ILLEGAL_IOMMU_PAGE_FAULT"),
    (0x0000_015A, "SDBUS_INTERNAL_ERROR"),
    (0x0000_015B, "WORKER_THREAD_RETURNED_WITH_SYSTEM_PAGE_PRIORITY_ACTIVE"),
    (0x0000_0160, "WIN32K_ATOMIC_CHECK_FAILURE"),
    (0x0000_0161, "LIVE_SYSTEM_DUMP"),
    (0x0000_0162, "KERNEL_AUTO_BOOST_INVALID_LOCK_RELEASE"),
    (0x0000_0163, "WORKER_THREAD_TEST_CONDITION"),
    (0x0000_0164, "WIN32K_CRITICAL_FAILURE"),
    (0x0000_016C, "INVALID_RUNDOWN_PROTECTION_FLAGS"),
    (0x0000_016D, "INVALID_SLOT_ALLOCATOR_FLAGS"),
    (0x0000_016E, "ERESOURCE_INVALID_RELEASE"),
    (0x0000_0171, "CRYPTO_LIBRARY_INTERNAL_ERROR"),
    (0x0000_0178, "ELAM_DRIVER_DETECTED_FATAL_ERROR"),
    (0x0000_017B, "PROFILER_CONFIGURATION_ILLEGAL"),
    (0x0000_017E, "MICROCODE_REVISION_MISMATCH"),
    (0x0000_0189, "BAD_OBJECT_HEADER"),
    (0x0000_018B, "SECURE_KERNEL_ERROR"),
    (0x0000_018C, "HYPERGUARD_VIOLATION"),
    (0x0000_018D, "SECURE_FAULT_UNHANDLED"),
    (0x0000_018E, "KERNEL_PARTITION_REFERENCE_VIOLATION"),
    (0x0000_0191, "PF_DETECTED_CORRUPTION"),
    (0x0000_0192, "KERNEL_AUTO_BOOST_LOCK_ACQUISITION_WITH_RAISED_IRQL"),
    (0x0000_0196, "LOADER_ROLLBACK_DETECTED"),
    (0x0000_0197, "WIN32K_SECURITY_FAILURE"),
    (0x0000_0199, "KERNEL_STORAGE_SLOT_IN_USE"),
    (0x0000_019A, "WORKER_THREAD_RETURNED_WHILE_ATTACHED_TO_SILO"),
    (0x0000_019B, "TTM_FATAL_ERROR"),
    (0x0000_019C, "WIN32K_POWER_WATCHDOG_TIMEOUT"),
    (0x0000_01A0, "TTM_WATCHDOG_TIMEOUT"),
    (0x0000_01A2, "WIN32K_CALLOUT_WATCHDOG_BUGCHECK"),
    (0x0000_01C6, "FAST_ERESOURCE_PRECONDITION_VIOLATION"),
    (0x0000_01C7, "STORE_DATA_STRUCTURE_CORRUPTION"),
    (0x0000_01C8, "MANUALLY_INITIATED_POWER_BUTTON_HOLD"),
    (0x0000_01CA, "SYNTHETIC_WATCHDOG_TIMEOUT"),
    (0x0000_01CB, "INVALID_SILO_DETACH"),
    (0x0000_01CD, "INVALID_CALLBACK_STACK_ADDRESS"),
    (0x0000_01CE, "INVALID_KERNEL_STACK_ADDRESS"),
    (0x0000_01CF, "HARDWARE_WATCHDOG_TIMEOUT"),
    (0x0000_01D0, "ACPI_FIRMWARE_WATCHDOG_TIMEOUT"),
    (0x0000_01D2, "WORKER_THREAD_INVALID_STATE"),
    (0x0000_01D3, "WFP_INVALID_OPERATION"),
    (0x0000_01D5, "DRIVER_PNP_WATCHDOG"),
    (0x0000_01D7, "EFS_FATAL_ERROR"),
    (0x0000_01D8, "UCMUCSI_FAILURE"),
    (0x0000_01D9, "HAL_IOMMU_INTERNAL_ERROR"),
    (0x0000_01DA, "HAL_BLOCKED_PROCESSOR_INTERNAL_ERROR"),
    (0x0000_01DB, "IPI_WATCHDOG_TIMEOUT"),
    (0x0000_01DC, "DMA_COMMON_BUFFER_VECTOR_ERROR"),
    (0x0000_01DD, "BUGCODE_MBBADAPTER_DRIVER"),
    (0x0000_01DE, "BUGCODE_WIFIADAPTER_DRIVER"),
    (0x0000_01DF, "PROCESSOR_START_TIMEOUT"),
    (0x0000_01E4, "VIDEO_DXGKRNL_SYSMM_FATAL_ERROR"),
    (0x0000_01E9, "ILLEGAL_ATS_INITIALIZATION"),
    (0x0000_01EA, "SECURE_PCI_CONFIG_SPACE_ACCESS_VIOLATION"),
    (0x0000_01EB, "DAM_WATCHDOG_TIMEOUT"),
    (0x0000_01ED, "HANDLE_ERROR_ON_CRITICAL_THREAD"),
    (0x0000_0BFE, "BC_BLUETOOTH_VERIFIER_FAULT"),
    (0x0000_0BFF, "BC_BTHMINI_VERIFIER_FAULT"),
    (0x0002_0001, "HYPERVISOR_ERROR"),
    (0x1000_007E, "SYSTEM_THREAD_EXCEPTION_NOT_HANDLED_M"),
    (0x1000_007F, "UNEXPECTED_KERNEL_MODE_TRAP_M"),
    (0x1000_008E, "KERNEL_MODE_EXCEPTION_NOT_HANDLED_M"),
    (0x1000_00EA, "THREAD_STUCK_IN_DEVICE_DRIVER_M"),
    (0x4000_008A, "THREAD_TERMINATE_HELD_MUTEX"),
    (0xC000_0218, "STATUS_CANNOT_LOAD_REGISTRY_FILE"),
    (0xC000_021A, "WINLOGON_FATAL_ERROR"),
    (0xC000_0221, "STATUS_IMAGE_CHECKSUM_MISMATCH"),
    (0xDEAD_DEAD, "MANUALLY_INITIATED_CRASH1"),
];

/// Stop codes whose parameters carry the address of the faulting instruction, with the index of
/// that parameter.
#[rustfmt::skip]
static PARAMETER_ADDRESS: &[(u32, usize)] = &[
    (0x0000_000A, 3),
    (0x0000_001E, 1),
    (0x0000_003B, 1),
    (0x0000_0050, 2),
    (0x0000_007E, 1),
    (0x0000_008E, 1),
    // the calling address for most verifier subtypes
    (0x0000_00C4, 1),
    (0x0000_00D1, 3),
    (0x0000_00D5, 2),
    (0x0000_00D6, 2),
    (0x1000_007E, 1),
    (0x1000_008E, 1),
];

/// Canonical name of a stop code.
pub fn name(code: u32) -> Option<&'static str> {
    BUG_CHECK_NAMES
        .binary_search_by_key(&code, |&(c, _)| c)
        .ok()
        .map(|idx| BUG_CHECK_NAMES[idx].1)
}

/// Name of a stop code, `UNKNOWN_0x<HEX>` for codes missing from the table.
pub fn name_or_unknown(code: u32) -> String {
    name(code)
        .map(str::to_string)
        .unwrap_or_else(|| format!("UNKNOWN_0x{:X}", code))
}

/// Number of known stop codes.
pub fn known_count() -> usize {
    BUG_CHECK_NAMES.len()
}

/// Index of the parameter holding a faulting instruction address, if the stop code has one.
pub fn parameter_address_index(code: u32) -> Option<usize> {
    PARAMETER_ADDRESS
        .iter()
        .find(|&&(c, _)| c == code)
        .map(|&(_, idx)| idx)
}

/// Stop code and parameters of a kernel crash.
#[derive(Debug, Clone, Eq, PartialEq)]
#[cfg_attr(feature = "serde_derive", derive(::serde::Serialize))]
pub struct BugCheckFacts {
    pub code: u32,
    /// Known name or `UNKNOWN_0x<HEX>`.
    pub name: String,
    pub parameters: [u64; 4],
}

impl BugCheckFacts {
    pub fn new(code: u32, parameters: [u64; 4]) -> Self {
        Self {
            code,
            name: name_or_unknown(code),
            parameters,
        }
    }

    pub fn is_known(&self) -> bool {
        name(self.code).is_some()
    }

    /// Faulting instruction address taken from the parameters.
    ///
    /// Zero parameters are treated as absent.
    pub fn parameter_address(&self) -> Option<u64> {
        parameter_address_index(self.code)
            .map(|idx| self.parameters[idx])
            .filter(|&addr| addr != 0)
    }
}

impl fmt::Display for BugCheckFacts {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "{} ({:#x}) [{:#x}, {:#x}, {:#x}, {:#x}]",
            self.name,
            self.code,
            self.parameters[0],
            self.parameters[1],
            self.parameters[2],
            self.parameters[3]
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn table_is_sorted() {
        assert!(BUG_CHECK_NAMES.windows(2).all(|w| w[0].0 < w[1].0));
        assert!(known_count() > 150);
    }

    #[test]
    fn known_names() {
        assert_eq!(name(0xA), Some("IRQL_NOT_LESS_OR_EQUAL"));
        assert_eq!(name(0x124), Some("WHEA_UNCORRECTABLE_ERROR"));
        assert_eq!(name(0x1000_007E), Some("SYSTEM_THREAD_EXCEPTION_NOT_HANDLED_M"));
    }

    #[test]
    fn unknown_names() {
        assert_eq!(name_or_unknown(0x65F4), "UNKNOWN_0x65F4");
        assert_eq!(name_or_unknown(0), "UNKNOWN_0x0");
        assert!(!BugCheckFacts::new(0x65F4, [0; 4]).is_known());
    }

    #[test]
    fn parameter_addresses() {
        let facts = BugCheckFacts::new(0xD1, [0x10, 2, 0, 0xfffff801_1234_5678]);
        assert_eq!(facts.parameter_address(), Some(0xfffff801_1234_5678));
        let facts = BugCheckFacts::new(0x50, [0xffff_8000_0000_0000, 0, 0, 0]);
        assert_eq!(facts.parameter_address(), None);
        let facts = BugCheckFacts::new(0x124, [0, 1, 2, 3]);
        assert_eq!(facts.parameter_address(), None);
    }

    #[test]
    fn display() {
        let facts = BugCheckFacts::new(0xA, [1, 2, 0, 0x1234]);
        assert_eq!(
            facts.to_string(),
            "IRQL_NOT_LESS_OR_EQUAL (0xa) [0x1, 0x2, 0x0, 0x1234]"
        );
    }
}
