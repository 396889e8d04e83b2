// Copyright (c) The Diem Core Contributors
// SPDX-License-Identifier: Apache-2.0

mod store;
